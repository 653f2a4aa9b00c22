//! 表达式模板
//!
//! `{f}` 为单字段占位符，`{f1}` `{f2}` `{f3}` 为多字段占位符。

/// 价量类基础字段，生成结果只会引用这些字段或调用方提供的字段
pub const PRICE_VOLUME_TOKENS: &[&str] = &[
    "open", "high", "low", "close", "volume", "vwap", "returns", "cap", "sharesout",
    "turnover", "volatility", "bookvalue",
];

/// 只对成交量类字段展开的模板
pub const VOLUME_LIKE_FIELDS: &[&str] = &["volume", "turnover", "vwap"];

pub const PRICE_ACTION: &[&str] = &[
    "group_rank((close - open)/open, subindustry)",
    "group_rank((open - delay(close, 1))/delay(close, 1), subindustry)",
    "group_rank((high - low)/open, subindustry)",
    "group_rank((close/delay(close, 5) - 1), subindustry)",
];

pub const VOLATILITY: &[&str] = &[
    "power(ts_std_dev(abs({f}), 30), 2) - power(ts_std_dev({f}, 30), 2)",
    "group_rank(std({f}, 20)/mean({f}, 20) * (1/cap), subindustry)",
    "ts_std_dev({f}, 10) / ts_std_dev({f}, 60) - 1",
    "zscore({f}) / ts_std_dev({f}, 20)",
];

pub const VOLUME: &[&str] = &[
    "group_rank((volume/sharesout - mean(volume/sharesout, 20))/std(volume/sharesout, 20), subindustry)",
    "ts_corr(volume/sharesout, abs(returns), 10)",
    "group_rank(ts_corr({f}/sharesout, returns, 10), subindustry)",
    "ts_rank({f}/mean({f}, 20), 10) - 1",
];

pub const CROSS_SECTIONAL: &[&str] = &[
    "group_neutralize(power(rank({f} - group_mean({f}, 1, subindustry)), 3), bucket(rank(cap), range='0,1,0.1'))",
    "group_rank(correlation({f}, volume/sharesout, 20), subindustry)",
    "group_rank(ts_rank({f}/cap, 10), subindustry)",
    "rank({f}) * (1/ts_rank(cap, 10))",
];

pub const CONDITIONAL: &[&str] = &[
    "trade_when(ts_rank(ts_std_dev(returns, 10), 252) < 0.9, {f}, -1)",
    "trade_when(volume > mean(volume, 20), {f}, -1)",
    "if_else(ts_rank({f}, 20) > 0.8, {f}, -{f})",
    "if_else(ts_rank({f}, 5) > 0.9, -1, 1) * {f}",
];

pub const MEAN_REVERSION: &[&str] = &[
    "group_rank(({f} - ts_mean({f}, 20))/ts_std_dev({f}, 20), subindustry)",
    "group_rank(({f} - ts_mean({f}, 60))/ts_std_dev({f}, 60), subindustry)",
    "({f} - ts_min({f}, 20))/(ts_max({f}, 20) - ts_min({f}, 20))",
    "{f}/ts_mean({f}, 20) - 1",
];

pub const MOMENTUM: &[&str] = &[
    "ts_rank({f}/delay({f}, 5), 10)",
    "ts_rank({f}/delay({f}, 20), 5)",
    "ts_rank({f}/delay({f}, 60), 3)",
    "if_else(ts_rank({f}, 20) > 0.9, -{f}, {f})",
    "ts_rank({f}/delay({f}, 5) - delay({f}/delay({f}, 5), 5), 10)",
    "{f} - group_mean({f}, 1, sector)",
    "ts_rank({f}/delay({f}, 1) - 1, 10) * sign(ts_rank(returns, 10))",
];

pub const VALUE: &[&str] = &[
    "rank({f}/cap)",
    "ts_rank({f}/bookvalue, 20)",
    "if_else(rank({f}) < 0.3, ts_rank(returns, 10), -ts_rank(returns, 10))",
    "({f} - group_mean({f}, 1, industry)) / group_std_dev({f}, 1, industry)",
    "ts_rank(({f}/mean({f}, 252) - 1), 10)",
    "rank({f}) * (1/ts_rank(cap, 10)) * sign(ts_rank(returns, 20))",
];

pub const MULTI_FIELD: &[&str] = &[
    "regression_neut(vector_neut({f1}, {f2}), abs(ts_mean(returns, 252)/ts_std_dev(returns, 252)))",
    "regression_neut(regression_neut({f1}, {f2}), ts_std_dev(returns, 30))",
    "{f1} - regression({f1}, {f2})",
    "regression_neut({f1}, {f2}) / ts_std_dev({f2}, 20)",
    "if_else(rank({f1}) > 0.5, {f2}, -1 * {f2})",
    "group_neutralize({f1} * {f2}, bucket(rank(cap), range='0.1,1,0.1'))",
    "if_else(ts_corr({f1}, returns, 20) > 0, {f1}*{f2}, -{f1}*{f2})",
    "sign(ts_corr({f1}, {f2}, 20)) * ({f1} + {f2})",
    "power(rank(group_neutralize(-ts_decay_exp_window(ts_sum(if_else({f1}-group_mean({f1},1,industry)-0.02>0,1,0)*ts_corr({f2},cap,5),3),50),industry)),2)",
    "trade_when(ts_rank(ts_std_dev(returns,10),252)<0.9, {f1} * {f2}, -1)",
    "ts_rank({f1}/{f2}, 10) * sign(ts_corr({f1}, returns, 5))",
    "ts_rank({f1}, 10) * ts_rank({f2}, 10) * sign(ts_corr({f1}, {f2}, 10))",
];

pub const ADVANCED_SINGLE: &[&str] = &[
    "0.5 * ts_zscore({f}, 10) + 0.3 * ts_zscore({f}, 20) + 0.2 * ts_zscore({f}, 60)",
    "ts_rank(power({f}/mean({f}, 20) - 1, 2), 10)",
    "rank({f}) - 0.5",
    "group_neutralize({f}, subindustry) * (1 + ts_rank(volatility, 20))",
    "ts_rank(log(abs({f} + 1)), 10)",
];

pub const ADVANCED_TRIPLE: &[&str] = &[
    "({f1} - mean({f1}, 20)) * ({f2} - mean({f2}, 20)) / std({f3}, 20)",
    "if_else(ts_corr({f1}, returns, 10) > ts_corr({f2}, returns, 10), {f1}, {f2})",
    "ts_rank({f1}, 10) * ts_rank({f2}, 10) - ts_rank({f3}, 10)",
    "sign(ts_corr({f1}, {f2}, 20)) * ts_rank({f3}, 10)",
];

pub const CLASSIC_STATIC: &[&str] = &[
    // 动量
    "group_rank((close - delay(close, 1))/delay(close, 1), subindustry)",
    "group_rank(close/delay(close, 5), subindustry)",
    "group_rank(close/delay(close, 10), subindustry)",
    "group_rank(close/delay(close, 20), subindustry)",
    "ts_rank((close/delay(close, 1) - 1)*100, 10)",
    // 均值回归
    "group_rank((close - ts_mean(close, 20))/ts_std_dev(close, 20), subindustry)",
    "group_rank((close - ts_mean(close, 60))/ts_std_dev(close, 60), subindustry)",
    "(close - ts_min(close, 20))/(ts_max(close, 20) - ts_min(close, 20))",
    "close/ts_mean(close, 20) - 1",
    // 成交量
    "group_rank((volume - delay(volume, 1))/delay(volume, 1), subindustry)",
    "group_rank(volume/ts_mean(volume, 20), subindustry)",
    "group_rank((volume - ts_mean(volume, 20))/ts_std_dev(volume, 20), subindustry)",
    "ts_rank(volume/sharesout * (close - open)/open, 10)",
    // 波动率
    "ts_rank((high - low)/open, 10)",
    "ts_std_dev(close, 10)/ts_mean(ts_std_dev(close, 10), 60)",
    "ts_rank(ts_std_dev(close/delay(close, 1), 5), 10)",
    "(high - low)/ts_mean(high - low, 20)",
];

pub const CLASSIC_FIELD: &[&str] = &[
    "group_rank({f}/delay({f}, 5), subindustry)",
    "group_rank(({f} - ts_mean({f}, 20))/ts_std_dev({f}, 20), subindustry)",
    "ts_rank(ts_std_dev({f}, 10), 10)",
    "group_rank({f}/delay({f}, 5), subindustry) - ts_rank(ts_std_dev({f}, 10), 10)",
];

pub const COMBINED_STATIC: &[&str] = &[
    "group_rank(close/delay(close, 5), subindustry) - group_rank(ts_std_dev(returns, 10), subindustry)",
    "((close - ts_min(close, 20))/(ts_max(close, 20) - ts_min(close, 20))) * ts_rank(volume, 10)",
    "group_rank((close - ts_mean(close, 20))/ts_std_dev(close, 20), subindustry) - group_rank(close/delay(close, 10), subindustry)",
    "ts_rank(ts_corr(close, volume/sharesout, 10), 10)",
];

pub const COMBINED_PAIR: &[&str] = &[
    "rank(ts_corr({f1}, {f2}, 10)) - rank(ts_delta({f1}, 10))",
    "ts_rank({f1}, 10) - ts_rank({f2}, 10)",
    "group_rank({f1}, subindustry) * ts_rank({f2}/ts_mean({f2}, 20), 10)",
    "ts_rank(ts_std_dev({f1}, 10), 10) + ts_rank(ts_std_dev({f2}, 10), 10)",
];

pub const INNOVATIVE_SINGLE: &[&str] = &[
    "ts_rank(power({f}/mean({f}, 10), 2), 10)",
    "sign({f}) * log(abs({f} + 1))",
    "ts_rank({f}, 5) * (1 + ts_rank(volatility, 10))",
    "rank({f}) * ts_rank(turnover, 10)",
];

pub const INNOVATIVE_PAIR: &[&str] = &[
    "ts_rank({f1}/{f2}, 10) * sign(ts_corr({f1}, returns, 10))",
    "group_neutralize(power({f1}, 2), subindustry) / group_mean({f2}, 1, subindustry)",
    "if_else(ts_rank({f1}, 10) > 0.8, {f2}, -{f2})",
];

pub const EXPLORATION_SINGLE: &[&str] = &[
    "ts_rank({f} - delay({f}, 10), 5)",
    "ts_rank({f}/delay({f}, 1) - 1, 10)",
    "ts_rank(ts_std_dev({f}, 10) / mean({f}, 10), 10)",
    "zscore(ts_rank({f}, 10)) * zscore(ts_rank(volume, 10))",
];

pub const EXPLORATION_TRIPLE: &[&str] = &[
    "({f1} * {f2}) / ({f3} + 1)",
    "ts_rank({f1}, 10) + ts_rank({f2}, 10) - 2 * ts_rank({f3}, 10)",
    "sign(ts_corr({f1}, {f2}, 20)) * ts_rank({f3}, 10)",
];

/// 单字段展开
pub fn render(template: &str, field: &str) -> String {
    template.replace("{f}", field)
}

/// 多字段展开，`fields[i]` 对应 `{f<i+1>}`
pub fn render_many(template: &str, fields: &[&str]) -> String {
    fields
        .iter()
        .enumerate()
        .fold(template.to_string(), |acc, (i, f)| {
            acc.replace(&format!("{{f{}}}", i + 1), f)
        })
}
