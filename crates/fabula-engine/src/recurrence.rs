//! Recurrence classification for boolean condition trees.
//!
//! Sources such as Fantasy Calendar describe when an event happens as nested
//! lists of typed predicates joined by `&&` / `||`:
//!
//! ```json
//! [["Month", "0", ["3"]], ["&&"], ["Day", "0", ["15"]]]
//! ```
//!
//! The tree is parsed once into [`ConditionNode`]s, then walked twice:
//! [`flatten`] collects every predicate in encounter order, and
//! [`split_or_branches`] splits the top level at `||` into independent
//! alternatives. Each alternative is mapped onto one canonical [`Recurrence`].
//!
//! # Limitations
//!
//! Only top-level `||` splits an event. A `||` inside a nested group is
//! flattened into the enclosing branch and reported as a warning.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::event::Recurrence;
use crate::model::{CalendarDate, CalendarModel};

/// Phase granularity assumed for a moon the context knows nothing about.
pub const DEFAULT_MOON_GRANULARITY: u32 = 8;

/// The predicate vocabulary understood by the classifier, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PredicateKind {
    Random,
    Date,
    Week,
    Weekday,
    Season,
    Year,
    Moons,
    Month,
    Day,
}

impl PredicateKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "Random" => Self::Random,
            "Date" => Self::Date,
            "Week" => Self::Week,
            "Weekday" => Self::Weekday,
            "Season" => Self::Season,
            "Year" => Self::Year,
            "Moons" => Self::Moons,
            "Month" => Self::Month,
            "Day" => Self::Day,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Date => "Date",
            Self::Week => "Week",
            Self::Weekday => "Weekday",
            Self::Season => "Season",
            Self::Year => "Year",
            Self::Moons => "Moons",
            Self::Month => "Month",
            Self::Day => "Day",
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single typed condition, e.g. `Month is 3`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub kind: PredicateKind,
    /// Source comparison selector; 0 is plain equality.
    pub comparison: u32,
    pub values: Vec<String>,
}

impl Predicate {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    fn int(&self, index: usize) -> Option<i64> {
        self.value(index).and_then(|v| v.trim().parse::<f64>().ok()).map(|v| v as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(Predicate),
    Op(Operator),
    Group(Vec<ConditionNode>),
    /// Something that could not be represented, carrying the warning to report.
    Unsupported(String),
}

/// A parsed condition tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    pub nodes: Vec<ConditionNode>,
}

impl ConditionTree {
    /// Parse a source condition list. Anything unrecognized becomes an
    /// [`ConditionNode::Unsupported`] node rather than an error.
    pub fn parse(value: &Value) -> Self {
        let nodes = match value {
            Value::Array(items) => items.iter().flat_map(parse_node).collect(),
            Value::Null => Vec::new(),
            other => vec![ConditionNode::Unsupported(format!(
                "condition list has unexpected shape `{}`; ignored",
                other
            ))],
        };
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parse_node(value: &Value) -> Vec<ConditionNode> {
    let Value::Array(items) = value else {
        return vec![ConditionNode::Unsupported(format!(
            "condition `{}` is not a list; ignored",
            value
        ))];
    };

    match items.first() {
        Some(Value::String(tag)) => parse_tagged(tag, items),
        // A bare list of lists is a plain group.
        Some(Value::Array(_)) => vec![ConditionNode::Group(
            items.iter().flat_map(parse_node).collect(),
        )],
        Some(other) => vec![ConditionNode::Unsupported(format!(
            "condition starting with `{}` is not recognized; ignored",
            other
        ))],
        None => Vec::new(),
    }
}

fn parse_tagged(tag: &str, items: &[Value]) -> Vec<ConditionNode> {
    match (tag, items.len()) {
        ("&&", 1) => return vec![ConditionNode::Op(Operator::And)],
        ("||", 1) => return vec![ConditionNode::Op(Operator::Or)],
        ("^", 1) => {
            return vec![
                ConditionNode::Unsupported(
                    "exclusive-or condition operator treated as `&&`".to_string(),
                ),
                ConditionNode::Op(Operator::And),
            ]
        }
        _ => {}
    }

    if let Some(kind) = PredicateKind::from_tag(tag) {
        let comparison = items
            .get(1)
            .and_then(scalar_text)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let values = match items.get(2) {
            Some(Value::Array(vs)) => vs.iter().filter_map(scalar_text).collect(),
            Some(v) => scalar_text(v).into_iter().collect(),
            None => Vec::new(),
        };
        return vec![ConditionNode::Leaf(Predicate {
            kind,
            comparison,
            values,
        })];
    }

    // Groups: ["", [...]], ["!", [...]], ["<n>", [...]].
    if let Some(Value::Array(children)) = items.get(1) {
        let children: Vec<ConditionNode> = children.iter().flat_map(parse_node).collect();
        let mut out = Vec::new();
        match tag {
            "" => {}
            "!" => out.push(ConditionNode::Unsupported(
                "negated condition group treated as a plain group".to_string(),
            )),
            other => out.push(ConditionNode::Unsupported(format!(
                "`{}` condition group treated as a plain group",
                other
            ))),
        }
        out.push(ConditionNode::Group(children));
        return out;
    }

    vec![ConditionNode::Unsupported(format!(
        "unsupported condition type `{}` ignored",
        tag
    ))]
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Every predicate in the tree, in encounter order, at any depth.
pub fn flatten(nodes: &[ConditionNode]) -> Vec<&Predicate> {
    let mut out = Vec::new();
    collect_leaves(nodes, &mut out);
    out
}

fn collect_leaves<'a>(nodes: &'a [ConditionNode], out: &mut Vec<&'a Predicate>) {
    for node in nodes {
        match node {
            ConditionNode::Leaf(p) => out.push(p),
            ConditionNode::Group(children) => collect_leaves(children, out),
            ConditionNode::Op(_) | ConditionNode::Unsupported(_) => {}
        }
    }
}

/// One alternative of a top-level `||`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Branch<'a> {
    pub leaves: Vec<&'a Predicate>,
    /// Warnings raised by nodes inside this branch.
    pub notes: Vec<String>,
}

impl Branch<'_> {
    pub fn kinds(&self) -> BTreeSet<PredicateKind> {
        self.leaves.iter().map(|p| p.kind).collect()
    }
}

/// Split the top level of the tree at every `||`.
///
/// Groups are merged into the branch that encloses them. Empty alternatives
/// (e.g. from a leading `||`) are dropped.
pub fn split_or_branches(nodes: &[ConditionNode]) -> Vec<Branch<'_>> {
    let mut branches = Vec::new();
    let mut current = Branch::default();

    for node in nodes {
        match node {
            ConditionNode::Op(Operator::Or) => {
                branches.push(std::mem::take(&mut current));
            }
            ConditionNode::Op(Operator::And) => {}
            ConditionNode::Leaf(p) => current.leaves.push(p),
            ConditionNode::Unsupported(note) => current.notes.push(note.clone()),
            ConditionNode::Group(children) => {
                collect_leaves(children, &mut current.leaves);
                collect_notes(children, &mut current.notes);
                if contains_or(children) {
                    current
                        .notes
                        .push("nested `||` inside a condition group was flattened into `&&`".to_string());
                }
            }
        }
    }
    branches.push(current);

    branches.retain(|b| !b.leaves.is_empty() || !b.notes.is_empty());
    branches
}

fn collect_notes(nodes: &[ConditionNode], out: &mut Vec<String>) {
    for node in nodes {
        match node {
            ConditionNode::Unsupported(note) => out.push(note.clone()),
            ConditionNode::Group(children) => collect_notes(children, out),
            _ => {}
        }
    }
}

fn contains_or(nodes: &[ConditionNode]) -> bool {
    nodes.iter().any(|n| match n {
        ConditionNode::Op(Operator::Or) => true,
        ConditionNode::Group(children) => contains_or(children),
        _ => false,
    })
}

/// What the classifier knows about the calendar an event belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    pub calendar: &'a CalendarModel,
    /// Phase granularity per moon index, as declared by the source.
    pub moon_granularity: &'a [u32],
    /// The date the source stored on the event itself, if any.
    pub event_date: Option<CalendarDate>,
}

/// One canonical result of classifying a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub recurrence: Recurrence,
    /// `None` only for one-off events with no date information at all.
    pub start_date: Option<CalendarDate>,
    pub warnings: Vec<String>,
}

/// Classify a whole tree.
///
/// Returns more than one result only when the top level holds `||`
/// alternatives that all use the same predicate kinds. Alternatives that mix
/// kinds collapse to the first one, with a warning.
pub fn classify(tree: &ConditionTree, ctx: &ClassifierContext<'_>) -> Vec<Classification> {
    let branches = split_or_branches(&tree.nodes);

    if branches.len() <= 1 {
        let notes = branches.into_iter().next().map(|b| b.notes).unwrap_or_default();
        let leaves = flatten(&tree.nodes);
        return vec![classify_branch(&leaves, notes, ctx)];
    }

    let first_kinds = branches[0].kinds();
    if branches.iter().all(|b| b.kinds() == first_kinds) {
        tracing::trace!(branches = branches.len(), "splitting `||` alternatives");
        return branches
            .into_iter()
            .map(|b| classify_branch(&b.leaves, b.notes, ctx))
            .collect();
    }

    let described: Vec<String> = branches.iter().map(|b| describe_kinds(&b.kinds())).collect();
    let dropped = branches.len() - 1;
    let first = branches.into_iter().next().unwrap_or_default();
    let mut result = classify_branch(&first.leaves, first.notes, ctx);
    result.warnings.push(format!(
        "`||` across differing condition types ({}); kept the first alternative and dropped {} other(s)",
        described.join(" | "),
        dropped
    ));
    vec![result]
}

fn describe_kinds(kinds: &BTreeSet<PredicateKind>) -> String {
    if kinds.is_empty() {
        return "nothing".to_string();
    }
    kinds.iter().map(|k| k.tag()).collect::<Vec<_>>().join(", ")
}

/// Classify a single conjunction of predicates.
pub fn classify_branch(
    leaves: &[&Predicate],
    notes: Vec<String>,
    ctx: &ClassifierContext<'_>,
) -> Classification {
    let mut warnings = notes;
    let kinds: BTreeSet<PredicateKind> = leaves.iter().map(|p| p.kind).collect();
    let has = |k: PredicateKind| kinds.contains(&k);
    let first = |k: PredicateKind| leaves.iter().copied().find(|p| p.kind == k);

    for p in leaves.iter().filter(|p| p.comparison != 0) {
        warnings.push(format!(
            "`{}` comparison #{} approximated as equality",
            p.kind, p.comparison
        ));
    }

    let mut parts = DateParts::from_leaves(leaves, ctx, &mut warnings);
    let no_month_day = !has(PredicateKind::Month) && !has(PredicateKind::Day);

    let (recurrence, honored): (Recurrence, Vec<PredicateKind>) = if let Some(p) =
        first(PredicateKind::Random)
    {
        let percent = p.value(0).and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or_else(|| {
            warnings.push("random condition has no probability; assuming 100%".to_string());
            100.0
        });
        let seed = p.value(1).and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or_else(|| {
            warnings.push("random condition has no seed; using 0".to_string());
            0
        });
        (
            Recurrence::Random {
                probability: (percent / 100.0).clamp(0.0, 1.0),
                seed,
            },
            vec![PredicateKind::Random],
        )
    } else if has(PredicateKind::Date) && no_month_day {
        if leaves.iter().filter(|p| p.kind == PredicateKind::Date).count() > 1 {
            warnings.push("several `Date` conditions in one alternative; kept the first".to_string());
        }
        (Recurrence::Never, Vec::new())
    } else if let (Some(p), false) = (first(PredicateKind::Week), has(PredicateKind::Day)) {
        let week = p.int(0).and_then(|w| u32::try_from(w).ok()).unwrap_or_else(|| {
            warnings.push("week condition has no week number; assuming week 1".to_string());
            1
        });
        let weekday = first(PredicateKind::Weekday).map(|w| resolve_weekday(w, ctx, &mut warnings));
        (
            Recurrence::WeekOfMonth { week, weekday },
            vec![PredicateKind::Week, PredicateKind::Weekday],
        )
    } else if let (Some(p), true) = (first(PredicateKind::Weekday), no_month_day) {
        let weekday = resolve_weekday(p, ctx, &mut warnings);
        (Recurrence::Weekly { weekday }, vec![PredicateKind::Weekday])
    } else if let (Some(p), true) = (first(PredicateKind::Season), no_month_day) {
        let season = resolve_season(p, ctx, &mut warnings);
        (Recurrence::Seasonal { season }, vec![PredicateKind::Season])
    } else if has(PredicateKind::Year) && no_month_day {
        (Recurrence::Never, Vec::new())
    } else if let (Some(p), true) = (first(PredicateKind::Moons), no_month_day) {
        (resolve_moon(p, ctx, &mut warnings), vec![PredicateKind::Moons])
    } else if has(PredicateKind::Month) && has(PredicateKind::Day) {
        if has(PredicateKind::Year) {
            warnings.push(
                "`Year` restriction on a yearly event cannot be represented; it repeats from that year on"
                    .to_string(),
            );
        }
        (Recurrence::Yearly, vec![PredicateKind::Month, PredicateKind::Day])
    } else if has(PredicateKind::Day) {
        (Recurrence::Monthly, vec![PredicateKind::Day])
    } else if has(PredicateKind::Month) {
        warnings.push("`Month` condition without a day; treated as yearly on day 1".to_string());
        parts.day.get_or_insert(1);
        (Recurrence::Yearly, vec![PredicateKind::Month])
    } else {
        (Recurrence::Never, Vec::new())
    };

    // Date and Year always place the start; anything else not honored is lost.
    let lost: Vec<&str> = kinds
        .iter()
        .filter(|&&k| {
            !honored.contains(&k)
                && !matches!(k, PredicateKind::Date | PredicateKind::Year)
                && !(recurrence == Recurrence::Never
                    && matches!(k, PredicateKind::Month | PredicateKind::Day))
        })
        .map(|k| k.tag())
        .collect();
    if !lost.is_empty() {
        warnings.push(format!(
            "conditions on {} cannot be combined with a {} recurrence and were dropped",
            lost.join(", "),
            recurrence.category()
        ));
    }

    let start_date = parts.resolve(ctx, recurrence != Recurrence::Never);
    tracing::trace!(category = recurrence.category(), ?start_date, "classified branch");

    Classification {
        recurrence,
        start_date,
        warnings,
    }
}

/// Date components gathered from `Date`, `Year`, `Month` and `Day` leaves.
#[derive(Debug, Default)]
struct DateParts {
    year: Option<i64>,
    month: Option<usize>,
    day: Option<u32>,
}

impl DateParts {
    fn from_leaves(
        leaves: &[&Predicate],
        ctx: &ClassifierContext<'_>,
        warnings: &mut Vec<String>,
    ) -> Self {
        let mut parts = DateParts::default();

        if let Some(p) = leaves.iter().find(|p| p.kind == PredicateKind::Date) {
            parts.year = p.int(0);
            parts.month = p.int(1).and_then(|m| usize::try_from(m).ok());
            parts.day = p.int(2).and_then(|d| u32::try_from(d).ok());
        }

        let years: Vec<i64> = leaves
            .iter()
            .filter(|p| p.kind == PredicateKind::Year)
            .flat_map(|p| p.values.iter().filter_map(|v| v.trim().parse::<i64>().ok()))
            .collect();
        if let Some(&year) = years.first() {
            if years.len() > 1 {
                warnings.push(format!(
                    "{} explicit years given; only year {} was honored",
                    years.len(),
                    year
                ));
            }
            parts.year = Some(year);
        }

        if let Some(p) = leaves.iter().find(|p| p.kind == PredicateKind::Month) {
            parts.month = p.int(0).and_then(|m| usize::try_from(m).ok());
        }
        if let Some(p) = leaves.iter().find(|p| p.kind == PredicateKind::Day) {
            parts.day = p.int(0).and_then(|d| u32::try_from(d).ok());
        }

        let months = ctx.calendar.months.len();
        if let Some(month) = parts.month {
            if months > 0 && month >= months {
                warnings.push(format!(
                    "month index {} is out of range; clamped to {}",
                    month,
                    months - 1
                ));
                parts.month = Some(months - 1);
            }
        }
        if parts.day == Some(0) {
            warnings.push("day 0 is not a valid day; using day 1".to_string());
            parts.day = Some(1);
        }
        parts
    }

    fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }

    /// Fill missing parts from the event's own date, then the calendar's
    /// current date. One-off events with nothing to go on stay undated.
    fn resolve(self, ctx: &ClassifierContext<'_>, recurring: bool) -> Option<CalendarDate> {
        if self.is_empty() && ctx.event_date.is_none() && !recurring {
            return None;
        }
        let base = ctx
            .event_date
            .or(ctx.calendar.current_date)
            .unwrap_or(CalendarDate::start_of_year(0));
        Some(CalendarDate::new(
            self.year.unwrap_or(base.year),
            self.month.unwrap_or(base.month),
            self.day.unwrap_or(base.day),
        ))
    }
}

fn resolve_weekday(p: &Predicate, ctx: &ClassifierContext<'_>, warnings: &mut Vec<String>) -> usize {
    let raw = p.value(0).unwrap_or_default();
    ctx.calendar.weekday_index(raw).unwrap_or_else(|| {
        warnings.push(format!("weekday `{}` not found in the calendar; using the first weekday", raw));
        0
    })
}

fn resolve_season(p: &Predicate, ctx: &ClassifierContext<'_>, warnings: &mut Vec<String>) -> usize {
    let raw = p.value(0).unwrap_or_default().trim();
    let seasons = &ctx.calendar.seasons;
    let by_index = raw.parse::<usize>().ok().filter(|&i| i < seasons.len());
    let by_name = || (0..seasons.len()).find(|&i| seasons.name(i).is_some_and(|n| n.eq_ignore_ascii_case(raw)));
    by_index.or_else(by_name).unwrap_or_else(|| {
        warnings.push(format!("season `{}` not found in the calendar; using the first season", raw));
        0
    })
}

fn resolve_moon(p: &Predicate, ctx: &ClassifierContext<'_>, warnings: &mut Vec<String>) -> Recurrence {
    let moon = p.int(0).and_then(|m| usize::try_from(m).ok()).unwrap_or_else(|| {
        warnings.push("moon condition has no moon index; using the first moon".to_string());
        0
    });
    if moon >= ctx.calendar.moons.len() {
        warnings.push(format!("moon index {} does not exist in the calendar", moon));
    }
    let granularity = ctx
        .moon_granularity
        .get(moon)
        .copied()
        .filter(|&g| g > 0)
        .unwrap_or(DEFAULT_MOON_GRANULARITY);
    let phase = p.int(1).unwrap_or(0).clamp(0, i64::from(granularity) - 1);
    let g = f64::from(granularity);
    Recurrence::Moon {
        moon,
        phase_start: phase as f64 / g,
        phase_end: (phase + 1) as f64 / g,
    }
}

/// Label sibling drafts split from one source event: `"Feast (2nd)"`.
pub fn branch_label(name: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        return name.to_string();
    }
    let n = index + 1;
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{} ({}{})", name, n, suffix)
}
