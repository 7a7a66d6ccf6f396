//! 分区器
//!
//! 把一次观察得到的扁平字段列表按纵向距离和容器归为逻辑分区，
//! 并推断一个可读的分区名。

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Button, Field, Section};

/// 相邻字段纵向间距超过该值时开启新分区
pub const SECTION_GAP_PX: f64 = 80.0;
/// 按钮归属判断时分区上方的余量
pub const BUTTON_MARGIN_ABOVE_PX: f64 = 20.0;
/// 按钮归属判断时分区下方的余量
pub const BUTTON_MARGIN_BELOW_PX: f64 = 60.0;

/// 容器名模式 → 分区名
const CONTAINER_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)work[-_ ]?experience|employment|work[-_ ]?history", "Work Experience"),
    (r"(?i)education|school", "Education"),
    (r"(?i)personal[-_ ]?info|my[-_ ]?information|legal[-_ ]?name", "Personal Information"),
    (r"(?i)contact|address|phone", "Contact Information"),
    (r"(?i)resume|cv|attachment", "Resume"),
    (r"(?i)skill", "Skills"),
    (r"(?i)language", "Languages"),
    (r"(?i)voluntary|disclosure|eeo|demographic", "Voluntary Disclosures"),
    (r"(?i)question|screening|application[-_ ]?questions", "Application Questions"),
];

/// 标签关键词词表
const LABEL_VOCABULARIES: &[(&str, &[&str])] = &[
    ("Name", &["first name", "last name", "full name", "middle name", "preferred name", "name"]),
    (
        "Contact Information",
        &["email", "phone", "address", "city", "state", "zip", "postal", "country"],
    ),
    (
        "Work Experience",
        &["company", "employer", "job title", "position", "start date", "end date", "responsibilities"],
    ),
    (
        "Education",
        &["school", "university", "college", "degree", "major", "gpa", "field of study", "graduation"],
    ),
];

fn container_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CONTAINER_PATTERNS
            .iter()
            .filter_map(|(pattern, name)| Regex::new(pattern).ok().map(|re| (re, *name)))
            .collect()
    })
}

fn trailing_index() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_](\d+)$").ok()).as_ref()
}

/// 把字段和按钮分组为有序分区
pub fn group_sections(fields: &[Field], buttons: &[Button]) -> Vec<Section> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y));

    let mut groups: Vec<Vec<Field>> = Vec::new();
    let mut prev: Option<&Field> = None;

    for field in sorted {
        let start_new = match prev {
            None => true,
            Some(p) => {
                field.bbox.y - p.bbox.bottom().max(p.bbox.y) > SECTION_GAP_PX
                    || field.hints.container != p.hints.container
            }
        };
        if start_new {
            groups.push(Vec::new());
        }
        if let Some(group) = groups.last_mut() {
            group.push(field.clone());
        }
        prev = Some(field);
    }

    let mut sections: Vec<Section> = groups
        .into_iter()
        .enumerate()
        .map(|(idx, fields)| {
            let y_start = fields.iter().map(|f| f.bbox.y).fold(f64::INFINITY, f64::min);
            let y_end = fields
                .iter()
                .map(|f| f.bbox.bottom())
                .fold(f64::NEG_INFINITY, f64::max);
            let all_filled = fields.iter().all(|f| !f.is_blank());
            Section {
                name: infer_section_name(&fields, idx),
                fields,
                buttons: Vec::new(),
                y_start,
                y_end,
                all_filled,
            }
        })
        .collect();

    for button in buttons {
        let y = button.bbox.center_y();
        if let Some(section) = sections.iter_mut().find(|s| {
            y >= s.y_start - BUTTON_MARGIN_ABOVE_PX && y <= s.y_end + BUTTON_MARGIN_BELOW_PX
        }) {
            section.buttons.push(button.clone());
        }
    }

    sections
}

/// 推断分区名：容器模式 → 标签词表 → "Section N"
pub fn infer_section_name(fields: &[Field], index: usize) -> String {
    if let Some(container) = fields.iter().find_map(|f| f.hints.container.as_deref()) {
        if let Some(name) = name_from_container(container) {
            return name;
        }
    }

    if let Some(name) = name_from_labels(fields) {
        return name;
    }

    format!("Section {}", index + 1)
}

fn name_from_container(container: &str) -> Option<String> {
    let (_, name) = container_patterns()
        .iter()
        .find(|(re, _)| re.is_match(container))?;

    // 重复行（workExperience-0、workExperience-1）带上序号
    match trailing_index()
        .and_then(|re| re.captures(container))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
    {
        Some(n) => Some(format!("{} {}", name, n + 1)),
        None => Some(name.to_string()),
    }
}

fn name_from_labels(fields: &[Field]) -> Option<String> {
    let labels: Vec<String> = fields.iter().map(|f| f.label.to_lowercase()).collect();

    let mut best: Option<(&str, usize)> = None;
    for (name, words) in LABEL_VOCABULARIES {
        let hits = labels
            .iter()
            .filter(|label| words.iter().any(|w| label.contains(w)))
            .count();
        if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
            best = Some((*name, hits));
        }
    }
    best.map(|(name, _)| name.to_string())
}
