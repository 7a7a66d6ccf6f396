//! 回读校验
//!
//! 比较期望写入的值与页面上回读到的值。

use crate::models::ActionVerb;

/// 回读值是否与期望一致
pub fn values_match(verb: ActionVerb, expected: &str, actual: Option<&str>) -> bool {
    let Some(actual) = actual else {
        return verb == ActionVerb::Click;
    };

    match verb {
        ActionVerb::Click => true,
        ActionVerb::Check => is_checked(actual),
        ActionVerb::Uncheck => !is_checked(actual),
        ActionVerb::Upload => !actual.trim().is_empty(),
        ActionVerb::Select => {
            let (e, a) = (normalize(expected), normalize(actual));
            !a.is_empty() && (a == e || a.contains(&e) || e.contains(&a))
        }
        ActionVerb::Fill => {
            let (e, a) = (normalize(expected), normalize(actual));
            if e == a {
                return true;
            }
            // 电话等字段常被页面自动格式化，只比较数字
            let (de, da) = (digits(expected), digits(actual));
            de.len() >= 7 && de == da
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "checked" | "yes"
    )
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}
