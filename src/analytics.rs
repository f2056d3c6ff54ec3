//! Usage analytics over a user's transformation history
//!
//! All functions are pure and total: empty input yields zeroed statistics,
//! missing fields count as neutral values, nothing divides by zero.
//! Frequency tables keep first-seen order because "preferred" values break
//! ties in favour of the key seen first.

use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, Timelike};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::HistoryRecord;

pub const DEFAULT_TOP_N: usize = 10;

/// Label used for missing categorical values
pub const UNKNOWN: &str = "unknown";

/// Counts keyed by string, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frequency {
    entries: Vec<(String, usize)>,
}

impl Frequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// Key with the highest count; the earliest key wins ties
    pub fn arg_max(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (key, count) in self.iter() {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((key, count));
            }
        }
        best.map(|(k, _)| k)
    }

    /// Entries sorted by count descending; equal counts keep first-seen order
    pub fn ranked(&self) -> Vec<RankEntry> {
        let mut ranked: Vec<RankEntry> = self
            .iter()
            .map(|(name, count)| RankEntry {
                name: name.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub total_transformations: usize,
    pub favorite_count: usize,
    /// Percentage, rounded
    pub favorite_rate: u32,
    pub average_input_length: u32,
    pub active_days: usize,
    /// Rounded to one decimal
    pub average_per_day: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePatterns {
    pub mode_distribution: Frequency,
    pub preferred_mode: String,
    pub purpose_distribution: Frequency,
    pub preferred_purpose: String,
    pub recipient_distribution: Frequency,
    pub preferred_recipient: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleAnalysis {
    pub style_distribution: Frequency,
    pub variant_distribution: Frequency,
    pub style_ranking: Vec<RankEntry>,
    pub favorite_style: String,
    pub styles_used: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageAnalysis {
    pub input_languages: Frequency,
    pub output_languages: Frequency,
    pub primary_input_language: String,
    pub primary_output_language: String,
    pub is_multilingual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPeriod {
    /// Comparison order used for tie-breaking
    pub const ORDER: [DayPeriod; 4] = [
        DayPeriod::Morning,
        DayPeriod::Afternoon,
        DayPeriod::Evening,
        DayPeriod::Night,
    ];

    /// Hours covered: night 0-5, morning 6-11, afternoon 12-17, evening 18-23
    pub fn hours(self) -> std::ops::Range<usize> {
        match self {
            DayPeriod::Night => 0..6,
            DayPeriod::Morning => 6..12,
            DayPeriod::Afternoon => 12..18,
            DayPeriod::Evening => 18..24,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayPeriod::Morning => "morning",
            DayPeriod::Afternoon => "afternoon",
            DayPeriod::Evening => "evening",
            DayPeriod::Night => "night",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePatterns {
    /// Index = hour of day (UTC)
    pub hourly: [usize; 24],
    /// Index 0 = Sunday
    pub weekly: [usize; 7],
    /// Index 0 = January
    pub monthly: [usize; 12],
    pub peak_hour: Option<usize>,
    pub peak_usage_pattern: DayPeriod,
}

impl Default for TimePatterns {
    fn default() -> Self {
        Self {
            hourly: [0; 24],
            weekly: [0; 7],
            monthly: [0; 12],
            peak_hour: None,
            peak_usage_pattern: DayPeriod::Morning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTransformation {
    pub id: String,
    pub original: String,
    pub disguised: String,
    pub style: String,
    pub usage_count: u32,
    pub is_favorited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedUserData {
    pub basic_stats: BasicStats,
    pub usage_patterns: UsagePatterns,
    pub style_analysis: StyleAnalysis,
    pub language_analysis: LanguageAnalysis,
    pub time_patterns: TimePatterns,
    pub top_transformations: Vec<TopTransformation>,
    pub user_tags: Vec<RankEntry>,
}

fn or_unknown(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN
    } else {
        trimmed
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn generate_basic_stats(records: &[HistoryRecord]) -> BasicStats {
    let total = records.len();
    if total == 0 {
        return BasicStats::default();
    }

    let favorite_count = records.iter().filter(|r| r.is_favorited).count();
    let total_chars: usize = records.iter().map(|r| r.original.chars().count()).sum();
    let active_days: HashSet<String> = records
        .iter()
        .filter_map(|r| r.created_at)
        .map(|t| t.date_naive().to_string())
        .collect();

    let average_per_day = if active_days.is_empty() {
        0.0
    } else {
        round_one_decimal(total as f64 / active_days.len() as f64)
    };

    BasicStats {
        total_transformations: total,
        favorite_count,
        favorite_rate: (favorite_count as f64 / total as f64 * 100.0).round() as u32,
        average_input_length: (total_chars as f64 / total as f64).round() as u32,
        active_days: active_days.len(),
        average_per_day,
    }
}

pub fn analyze_usage_patterns(records: &[HistoryRecord]) -> UsagePatterns {
    let mut modes = Frequency::new();
    let mut purposes = Frequency::new();
    let mut recipients = Frequency::new();

    for record in records {
        modes.add(or_unknown(&record.conversion_mode));
        if let Some(purpose) = record.purpose.as_deref().filter(|p| !p.trim().is_empty()) {
            purposes.add(purpose.trim());
        }
        if let Some(recipient) = record.recipient.as_deref().filter(|r| !r.trim().is_empty()) {
            recipients.add(recipient.trim());
        }
    }

    UsagePatterns {
        preferred_mode: modes.arg_max().unwrap_or(UNKNOWN).to_string(),
        preferred_purpose: purposes.arg_max().unwrap_or(UNKNOWN).to_string(),
        preferred_recipient: recipients.arg_max().unwrap_or(UNKNOWN).to_string(),
        mode_distribution: modes,
        purpose_distribution: purposes,
        recipient_distribution: recipients,
    }
}

pub fn analyze_styles(records: &[HistoryRecord]) -> StyleAnalysis {
    let mut styles = Frequency::new();
    let mut variants = Frequency::new();

    for record in records {
        styles.add(or_unknown(&record.style));
        if let Some(variant) = record.variant.as_deref().filter(|v| !v.trim().is_empty()) {
            variants.add(variant.trim());
        }
    }

    let style_ranking = styles.ranked();
    StyleAnalysis {
        favorite_style: style_ranking
            .first()
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        styles_used: styles.len(),
        style_distribution: styles,
        variant_distribution: variants,
        style_ranking,
    }
}

pub fn analyze_languages(records: &[HistoryRecord]) -> LanguageAnalysis {
    let mut inputs = Frequency::new();
    let mut outputs = Frequency::new();

    for record in records {
        inputs.add(or_unknown(&record.detected_language));
        outputs.add(or_unknown(&record.output_language));
    }

    LanguageAnalysis {
        primary_input_language: inputs.arg_max().unwrap_or(UNKNOWN).to_string(),
        primary_output_language: outputs.arg_max().unwrap_or(UNKNOWN).to_string(),
        is_multilingual: inputs.iter().filter(|(k, _)| *k != UNKNOWN).count() > 1,
        input_languages: inputs,
        output_languages: outputs,
    }
}

pub fn analyze_time_patterns(records: &[HistoryRecord]) -> TimePatterns {
    let mut patterns = TimePatterns::default();

    for created_at in records.iter().filter_map(|r| r.created_at) {
        patterns.hourly[created_at.hour() as usize] += 1;
        patterns.weekly[created_at.weekday().num_days_from_sunday() as usize] += 1;
        patterns.monthly[created_at.month0() as usize] += 1;
    }

    let mut peak_hour: Option<(usize, usize)> = None;
    for (hour, &count) in patterns.hourly.iter().enumerate() {
        if count > 0 && peak_hour.map_or(true, |(_, c)| count > c) {
            peak_hour = Some((hour, count));
        }
    }
    patterns.peak_hour = peak_hour.map(|(h, _)| h);
    patterns.peak_usage_pattern = peak_period(&patterns.hourly);

    patterns
}

/// Period whose hours sum highest; on ties the earlier period in
/// [`DayPeriod::ORDER`] is kept
pub fn peak_period(hourly: &[usize; 24]) -> DayPeriod {
    let mut best = DayPeriod::ORDER[0];
    let mut best_sum = 0;
    for period in DayPeriod::ORDER {
        let sum: usize = hourly[period.hours()].iter().sum();
        if sum > best_sum {
            best = period;
            best_sum = sum;
        }
    }
    best
}

/// Records reused or favourited, most used first, favourites first on ties
pub fn top_transformations(records: &[HistoryRecord], n: usize) -> Vec<TopTransformation> {
    let mut reused: Vec<&HistoryRecord> = records
        .iter()
        .filter(|r| r.usage_count > 1 || r.is_favorited)
        .collect();

    reused.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| b.is_favorited.cmp(&a.is_favorited))
    });

    reused
        .into_iter()
        .take(n)
        .map(|r| TopTransformation {
            id: r.id.clone(),
            original: r.original.clone(),
            disguised: r.disguised.clone(),
            style: or_unknown(&r.style).to_string(),
            usage_count: r.usage_count,
            is_favorited: r.is_favorited,
        })
        .collect()
}

pub fn collect_tags(records: &[HistoryRecord]) -> Vec<RankEntry> {
    let mut tags = Frequency::new();
    for tag in records.iter().flat_map(|r| r.tags.iter()) {
        let tag = tag.trim();
        if !tag.is_empty() {
            tags.add(tag);
        }
    }
    tags.ranked()
}

/// Full aggregate for one user; recomputed on every call
pub fn process_user_data(records: &[HistoryRecord], top_n: usize) -> ProcessedUserData {
    ProcessedUserData {
        basic_stats: generate_basic_stats(records),
        usage_patterns: analyze_usage_patterns(records),
        style_analysis: analyze_styles(records),
        language_analysis: analyze_languages(records),
        time_patterns: analyze_time_patterns(records),
        top_transformations: top_transformations(records, top_n),
        user_tags: collect_tags(records),
    }
}

/// Plain observations derived from the aggregate without any model call
pub fn rule_based_insights(data: &ProcessedUserData) -> Vec<String> {
    let stats = &data.basic_stats;
    if stats.total_transformations == 0 {
        return vec!["No transformations yet. Try a style to get started.".to_string()];
    }

    let mut insights = Vec::new();

    insights.push(format!(
        "You have made {} transformations across {} active day(s), about {} per day.",
        stats.total_transformations, stats.active_days, stats.average_per_day
    ));

    if data.style_analysis.favorite_style != UNKNOWN {
        insights.push(format!(
            "Your most used style is \"{}\" out of {} style(s) tried.",
            data.style_analysis.favorite_style, data.style_analysis.styles_used
        ));
    }

    if stats.favorite_rate >= 30 {
        insights.push(format!(
            "You favourite {}% of your results; consider saving a custom style from them.",
            stats.favorite_rate
        ));
    }

    if data.time_patterns.peak_hour.is_some() {
        insights.push(format!(
            "You are most active in the {}.",
            data.time_patterns.peak_usage_pattern.label()
        ));
    }

    if data.language_analysis.is_multilingual {
        insights.push(format!(
            "You write in {} languages; auto-detection picks the output language for you.",
            data.language_analysis.input_languages.len()
        ));
    }

    if data.style_analysis.styles_used == 1 {
        insights.push("Try a few other styles to discover new tones.".to_string());
    }

    insights
}

/// Markdown usage report for export
pub struct UsageReport<'a> {
    pub data: &'a ProcessedUserData,
    pub insights: &'a [String],
}

impl fmt::Display for UsageReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data;
        let stats = &data.basic_stats;

        writeln!(f, "# Usage Report\n")?;
        writeln!(f, "## Overview\n")?;
        writeln!(f, "- Total transformations: {}", stats.total_transformations)?;
        writeln!(f, "- Favorites: {} ({}%)", stats.favorite_count, stats.favorite_rate)?;
        writeln!(f, "- Average input length: {} characters", stats.average_input_length)?;
        writeln!(f, "- Active days: {}", stats.active_days)?;
        writeln!(f, "- Average per active day: {}", stats.average_per_day)?;

        writeln!(f, "\n## Styles\n")?;
        if data.style_analysis.style_ranking.is_empty() {
            writeln!(f, "_No styles used yet._")?;
        }
        for (i, entry) in data.style_analysis.style_ranking.iter().enumerate() {
            writeln!(f, "{}. {} ({})", i + 1, entry.name, entry.count)?;
        }

        writeln!(f, "\n## Languages\n")?;
        writeln!(
            f,
            "- Primary input: {}\n- Primary output: {}",
            data.language_analysis.primary_input_language,
            data.language_analysis.primary_output_language
        )?;

        writeln!(f, "\n## Activity\n")?;
        writeln!(f, "- Peak period: {}", data.time_patterns.peak_usage_pattern.label())?;
        if let Some(hour) = data.time_patterns.peak_hour {
            writeln!(f, "- Peak hour: {:02}:00 UTC", hour)?;
        }

        if !data.top_transformations.is_empty() {
            writeln!(f, "\n## Most Reused\n")?;
            for item in &data.top_transformations {
                let star = if item.is_favorited { " ★" } else { "" };
                writeln!(
                    f,
                    "- [{}] \"{}\" → \"{}\" (used {}x){}",
                    item.style, item.original, item.disguised, item.usage_count, star
                )?;
            }
        }

        if !self.insights.is_empty() {
            writeln!(f, "\n## Insights\n")?;
            for insight in self.insights {
                writeln!(f, "- {}", insight)?;
            }
        }

        Ok(())
    }
}

pub fn render_report(data: &ProcessedUserData, insights: &[String]) -> String {
    UsageReport { data, insights }.to_string()
}
