//! Insight Presenter
//!
//! Pure transform from an [`InsightSnapshot`] into display-ready sections.
//! Which sections are expanded is view state owned by the front end
//! ([`ExpandedSections`]), passed in on every call.

use crate::models::InsightSnapshot;
use std::collections::HashMap;

/// The four fixed sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Overview,
    Quality,
    Patterns,
    Recommendations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Overview,
        SectionKind::Quality,
        SectionKind::Patterns,
        SectionKind::Recommendations,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Overview => "Dataset Overview",
            SectionKind::Quality => "Data Quality",
            SectionKind::Patterns => "Detected Patterns",
            SectionKind::Recommendations => "Recommendations",
        }
    }
}

/// Completeness rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Good,
    Warn,
    Poor,
}

impl QualityTier {
    /// `>= 0.90` is good, `>= 0.70` warn, anything else (NaN included) poor.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.90 {
            QualityTier::Good
        } else if ratio >= 0.70 {
            QualityTier::Warn
        } else {
            QualityTier::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Good => "good",
            QualityTier::Warn => "warn",
            QualityTier::Poor => "poor",
        }
    }
}

/// Expand/collapse flags keyed by section. Sections start expanded.
#[derive(Debug, Clone, Default)]
pub struct ExpandedSections {
    flags: HashMap<SectionKind, bool>,
}

impl ExpandedSections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, kind: SectionKind) -> bool {
        self.flags.get(&kind).copied().unwrap_or(true)
    }

    pub fn set(&mut self, kind: SectionKind, expanded: bool) {
        self.flags.insert(kind, expanded);
    }

    pub fn toggle(&mut self, kind: SectionKind) {
        let expanded = self.is_expanded(kind);
        self.flags.insert(kind, !expanded);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Overview {
        rows: Option<u64>,
        columns: Option<u64>,
        numeric_columns: usize,
        categorical_columns: usize,
    },
    Quality {
        completeness_percent: f64,
        tier: QualityTier,
        duplicate_rows: u64,
    },
    Items(Vec<String>),
}

impl SectionBody {
    /// One-line rendering, e.g. `100 rows / 5 columns / 2 numeric / 1 categorical`.
    pub fn summary(&self) -> String {
        match self {
            SectionBody::Overview {
                rows,
                columns,
                numeric_columns,
                categorical_columns,
            } => format!(
                "{} rows / {} columns / {} numeric / {} categorical",
                count_or_na(*rows),
                count_or_na(*columns),
                numeric_columns,
                categorical_columns
            ),
            SectionBody::Quality {
                completeness_percent,
                tier,
                duplicate_rows,
            } => format!(
                "{:.1}% complete ({}) / {} duplicate rows",
                completeness_percent,
                tier.label(),
                duplicate_rows
            ),
            SectionBody::Items(items) => items.join("\n"),
        }
    }
}

fn count_or_na(count: Option<u64>) -> String {
    count.map_or_else(|| "N/A".to_string(), |n| n.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub kind: SectionKind,
    pub title: &'static str,
    /// Item count badge, shown for list sections.
    pub count: Option<usize>,
    pub expanded: bool,
    /// `None` while collapsed.
    pub body: Option<SectionBody>,
}

/// Build the section list for `snapshot`.
///
/// Patterns and Recommendations are left out entirely when empty.
pub fn present(snapshot: &InsightSnapshot, expanded: &ExpandedSections) -> Vec<SectionView> {
    SectionKind::ALL
        .iter()
        .filter_map(|&kind| {
            let (count, body) = match kind {
                SectionKind::Overview => {
                    let stats = &snapshot.basic_stats;
                    (
                        None,
                        SectionBody::Overview {
                            rows: stats.row_count,
                            columns: stats.column_count,
                            numeric_columns: stats.numeric_column_count,
                            categorical_columns: stats.categorical_column_count,
                        },
                    )
                }
                SectionKind::Quality => {
                    let quality = &snapshot.data_quality;
                    (
                        None,
                        SectionBody::Quality {
                            completeness_percent: quality.completeness_ratio * 100.0,
                            tier: QualityTier::from_ratio(quality.completeness_ratio),
                            duplicate_rows: quality.duplicate_row_count,
                        },
                    )
                }
                SectionKind::Patterns => list_section(&snapshot.patterns)?,
                SectionKind::Recommendations => list_section(&snapshot.recommendations)?,
            };

            let is_expanded = expanded.is_expanded(kind);
            Some(SectionView {
                kind,
                title: kind.title(),
                count,
                expanded: is_expanded,
                body: is_expanded.then_some(body),
            })
        })
        .collect()
}

fn list_section(items: &[String]) -> Option<(Option<usize>, SectionBody)> {
    if items.is_empty() {
        return None;
    }
    Some((Some(items.len()), SectionBody::Items(items.to_vec())))
}
