use crate::generate::mode::Mode;
use crate::generate::templates::{self as t, render, render_many};
use std::collections::HashSet;

/// 按模式生成候选表达式
///
/// 纯函数：相同输入得到相同顺序的输出，重复项保留第一次出现。
pub fn generate(fields: &[String], mode: Mode) -> Vec<String> {
    let out = match mode {
        Mode::Basic => basic(fields),
        Mode::CrossSectional => per_field(fields, t::CROSS_SECTIONAL),
        Mode::MeanReversion => per_field(fields, t::MEAN_REVERSION),
        Mode::Momentum => per_field(fields, t::MOMENTUM),
        Mode::Volatility => per_field(fields, t::VOLATILITY),
        Mode::Value => per_field(fields, t::VALUE),
        Mode::Conditional => per_field(fields, t::CONDITIONAL),
        Mode::MultiField => multi_field(fields),
        Mode::Advanced => advanced(fields),
        Mode::Classic => classic(fields),
        Mode::Combined => combined(fields),
    };
    dedup(out)
}

/// 保序去重
pub fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

fn per_field(fields: &[String], templates: &[&str]) -> Vec<String> {
    fields
        .iter()
        .flat_map(move |f| templates.iter().map(move |tpl| render(tpl, f)))
        .collect()
}

/// 无字段时退化为纯价格模板
pub(crate) fn basic(fields: &[String]) -> Vec<String> {
    if fields.is_empty() {
        return t::PRICE_ACTION.iter().map(|s| s.to_string()).collect();
    }
    let mut out = Vec::new();
    for f in fields {
        out.extend(t::PRICE_ACTION.iter().map(|s| s.to_string()));
        out.extend(t::VOLATILITY.iter().map(|tpl| render(tpl, f)));
        if t::VOLUME_LIKE_FIELDS.contains(&f.as_str()) {
            out.extend(t::VOLUME.iter().map(|tpl| render(tpl, f)));
        }
        out.extend(t::CROSS_SECTIONAL.iter().map(|tpl| render(tpl, f)));
        out.extend(t::CONDITIONAL.iter().map(|tpl| render(tpl, f)));
    }
    out
}

/// 两两配对，末尾落单的字段丢弃
fn multi_field(fields: &[String]) -> Vec<String> {
    fields
        .chunks_exact(2)
        .flat_map(|pair| {
            let refs = [pair[0].as_str(), pair[1].as_str()];
            t::MULTI_FIELD
                .iter()
                .map(move |tpl| render_many(tpl, &refs))
        })
        .collect()
}

fn advanced(fields: &[String]) -> Vec<String> {
    let mut out = per_field(&fields[..fields.len().min(5)], t::ADVANCED_SINGLE);
    if let [f1, f2, f3, ..] = fields {
        let refs = [f1.as_str(), f2.as_str(), f3.as_str()];
        out.extend(t::ADVANCED_TRIPLE.iter().map(|tpl| render_many(tpl, &refs)));
    }
    out
}

pub(crate) fn classic(fields: &[String]) -> Vec<String> {
    let mut out: Vec<String> = t::CLASSIC_STATIC
        .iter()
        .chain(t::COMBINED_STATIC)
        .map(|s| s.to_string())
        .collect();
    out.extend(per_field(&fields[..fields.len().min(3)], t::CLASSIC_FIELD));
    out
}

pub(crate) fn combined(fields: &[String]) -> Vec<String> {
    let mut out: Vec<String> = t::COMBINED_STATIC.iter().map(|s| s.to_string()).collect();
    if let [f1, f2, ..] = fields {
        let refs = [f1.as_str(), f2.as_str()];
        out.extend(t::COMBINED_PAIR.iter().map(|tpl| render_many(tpl, &refs)));
    }
    out
}

pub(crate) fn innovative(fields: &[String]) -> Vec<String> {
    let mut out = per_field(&fields[..fields.len().min(3)], t::INNOVATIVE_SINGLE);
    if let [f1, f2, ..] = fields {
        let refs = [f1.as_str(), f2.as_str()];
        out.extend(t::INNOVATIVE_PAIR.iter().map(|tpl| render_many(tpl, &refs)));
    }
    out
}

pub(crate) fn exploration(fields: &[String]) -> Vec<String> {
    let mut out = per_field(&fields[..fields.len().min(2)], t::EXPLORATION_SINGLE);
    if let [f1, f2, f3, ..] = fields {
        let refs = [f1.as_str(), f2.as_str(), f3.as_str()];
        out.extend(t::EXPLORATION_TRIPLE.iter().map(|tpl| render_many(tpl, &refs)));
    }
    out
}
