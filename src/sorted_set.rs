//! Ordered set: unique members, each tagged with a floating point score.
//!
//! Members are grouped in score buckets kept in a `BTreeMap` ordered by score, with an inverse
//! `member -> score` index for existence tests and score lookups. A member lives in exactly one
//! bucket, so a score update is a removal from the old bucket followed by an insertion into the
//! new one. Within a bucket members are ordered by their byte representation, which is the
//! tie-break the store uses for equal scores.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use strum_macros::{AsRefStr, EnumString};

use crate::commands::CommandError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    buckets: BTreeMap<OrderedFloat<f64>, BTreeSet<String>>,
    scores: HashMap<String, f64>,
    len: usize,
}

/// A score range endpoint. Infinite endpoints are expressed with `f64::INFINITY` and
/// `f64::NEG_INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    fn value(&self) -> f64 {
        match self {
            ScoreBound::Inclusive(value) | ScoreBound::Exclusive(value) => *value,
        }
    }

    fn bound(&self) -> Bound<OrderedFloat<f64>> {
        match self {
            ScoreBound::Inclusive(value) => Bound::Included(OrderedFloat(*value)),
            ScoreBound::Exclusive(value) => Bound::Excluded(OrderedFloat(*value)),
        }
    }
}

impl FromStr for ScoreBound {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (exclusive, number) = match s.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let value = number
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| CommandError::InvalidArgument("min or max is not a float".to_string()))?;

        Ok(if exclusive {
            ScoreBound::Exclusive(value)
        } else {
            ScoreBound::Inclusive(value)
        })
    }
}

/// A lexicographical range endpoint: `[member`, `(member`, `-` or `+`.
#[derive(Debug, Clone, PartialEq)]
pub enum LexBound {
    Inclusive(String),
    Exclusive(String),
    /// `-`, smaller than every member.
    Min,
    /// `+`, greater than every member.
    Max,
}

impl LexBound {
    fn admits_from_below(&self, member: &str) -> bool {
        match self {
            LexBound::Inclusive(min) => member >= min.as_str(),
            LexBound::Exclusive(min) => member > min.as_str(),
            LexBound::Min => true,
            LexBound::Max => false,
        }
    }

    fn admits_from_above(&self, member: &str) -> bool {
        match self {
            LexBound::Inclusive(max) => member <= max.as_str(),
            LexBound::Exclusive(max) => member < max.as_str(),
            LexBound::Min => false,
            LexBound::Max => true,
        }
    }
}

impl FromStr for LexBound {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.chars().next() {
            Some('[') => Ok(LexBound::Inclusive(s[1..].to_string())),
            Some('(') => Ok(LexBound::Exclusive(s[1..].to_string())),
            Some('-') if s.len() == 1 => Ok(LexBound::Min),
            Some('+') if s.len() == 1 => Ok(LexBound::Max),
            _ => Err(CommandError::InvalidRangeItem),
        }
    }
}

/// How scores of the same member coming from different sources are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn combine(self, acc: f64, score: f64) -> f64 {
        match self {
            Aggregate::Sum => nan_to_zero(acc + score),
            Aggregate::Min => acc.min(score),
            Aggregate::Max => acc.max(score),
        }
    }
}

// `inf + -inf` and `inf * 0` are defined as zero by the store.
fn nan_to_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Offset and count applied to a range result, as in `LIMIT offset count`. A negative count
/// returns all the remaining elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub offset: usize,
    pub count: i64,
}

impl Limit {
    fn apply<'a, I>(limit: Option<Limit>, iter: I) -> Vec<(&'a str, f64)>
    where
        I: Iterator<Item = (&'a str, f64)>,
    {
        match limit {
            None => iter.collect(),
            Some(Limit { offset, count }) if count < 0 => iter.skip(offset).collect(),
            Some(Limit { offset, count }) => iter.skip(offset).take(count as usize).collect(),
        }
    }
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.scores.contains_key(member)
    }

    /// Adds `member` with `score`, moving it to the new score bucket if it already exists.
    /// Returns whether the member is new.
    pub fn add(&mut self, score: f64, member: String) -> bool {
        let is_new = match self.scores.get(&member) {
            Some(&old) if old == score => return false,
            Some(&old) => {
                self.remove_from_bucket(old, &member);
                false
            }
            None => true,
        };

        self.buckets
            .entry(OrderedFloat(score))
            .or_default()
            .insert(member.clone());
        self.scores.insert(member, score);

        if is_new {
            self.len += 1;
        }

        is_new
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.remove_from_bucket(score, member);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    fn remove_from_bucket(&mut self, score: f64, member: &str) {
        let key = OrderedFloat(score);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(member);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Members in ascending `(score, member)` order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        self.buckets.iter().flat_map(|(score, bucket)| {
            bucket.iter().map(move |member| (member.as_str(), score.0))
        })
    }

    /// Zero based position of `member` in ascending order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = OrderedFloat(self.score(member)?);

        let lower: usize = self
            .buckets
            .range(..score)
            .map(|(_, bucket)| bucket.len())
            .sum();
        let within = self.buckets.get(&score).map_or(0, |bucket| {
            bucket
                .range::<str, _>((Bound::Unbounded, Bound::Excluded(member)))
                .count()
        });

        Some(lower + within)
    }

    /// Zero based position of `member` in descending order.
    pub fn rev_rank(&self, member: &str) -> Option<usize> {
        self.rank(member).map(|rank| self.len - 1 - rank)
    }

    /// Members between the `start` and `stop` ranks, both inclusive. Negative indexes count from
    /// the end, `-1` being the last member.
    pub fn range_by_rank(&self, start: i64, stop: i64, rev: bool) -> Vec<(&str, f64)> {
        let Some((start, stop)) = normalize_range(start, stop, self.len) else {
            return vec![];
        };

        let take = stop - start + 1;
        if rev {
            self.iter().rev().skip(start).take(take).collect()
        } else {
            self.iter().skip(start).take(take).collect()
        }
    }

    /// Members whose score lies between `min` and `max`. With `rev` the result is in descending
    /// order, the bounds keep their meaning.
    pub fn range_by_score(
        &self,
        min: ScoreBound,
        max: ScoreBound,
        rev: bool,
        limit: Option<Limit>,
    ) -> Vec<(&str, f64)> {
        let (low, high) = (min.value(), max.value());
        let both_exclusive =
            matches!((min, max), (ScoreBound::Exclusive(_), ScoreBound::Exclusive(_)));
        if low > high || (low == high && both_exclusive) {
            return vec![];
        }

        let members = self
            .buckets
            .range((min.bound(), max.bound()))
            .flat_map(|(score, bucket)| bucket.iter().map(move |member| (member.as_str(), score.0)));

        if rev {
            Limit::apply(limit, members.rev())
        } else {
            Limit::apply(limit, members)
        }
    }

    /// Members between `min` and `max` compared as strings. Only meaningful when every member has
    /// the same score, which is how lexicographical ranges are meant to be used.
    pub fn range_by_lex(
        &self,
        min: &LexBound,
        max: &LexBound,
        rev: bool,
        limit: Option<Limit>,
    ) -> Vec<(&str, f64)> {
        let within = |&(member, _): &(&str, f64)| {
            min.admits_from_below(member) && max.admits_from_above(member)
        };

        if rev {
            Limit::apply(limit, self.iter().rev().filter(within))
        } else {
            Limit::apply(limit, self.iter().filter(within))
        }
    }

    pub fn count_by_score(&self, min: ScoreBound, max: ScoreBound) -> usize {
        self.range_by_score(min, max, false, None).len()
    }

    pub fn count_by_lex(&self, min: &LexBound, max: &LexBound) -> usize {
        self.range_by_lex(min, max, false, None).len()
    }

    /// Removes the members in the given rank range, returning how many were removed.
    pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> usize {
        let members = owned_members(self.range_by_rank(start, stop, false));
        self.remove_all(members)
    }

    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> usize {
        let members = owned_members(self.range_by_score(min, max, false, None));
        self.remove_all(members)
    }

    pub fn remove_range_by_lex(&mut self, min: &LexBound, max: &LexBound) -> usize {
        let members = owned_members(self.range_by_lex(min, max, false, None));
        self.remove_all(members)
    }

    /// Removes and returns up to `count` members with the lowest (or, with `max`, the highest)
    /// scores.
    pub fn pop(&mut self, count: usize, max: bool) -> Vec<(String, f64)> {
        let popped: Vec<(String, f64)> = if max {
            self.iter()
                .rev()
                .take(count)
                .map(|(m, s)| (m.to_string(), s))
                .collect()
        } else {
            self.iter()
                .take(count)
                .map(|(m, s)| (m.to_string(), s))
                .collect()
        };

        for (member, _) in popped.iter() {
            self.remove(member);
        }
        popped
    }

    fn remove_all(&mut self, members: Vec<String>) -> usize {
        members.iter().filter(|member| self.remove(member)).count()
    }

    /// Union of the weighted `sources`. A member's score is the aggregate over the sources that
    /// contain it.
    pub fn union(sources: &[(SortedSet, f64)], aggregate: Aggregate) -> SortedSet {
        let mut scores: HashMap<&str, f64> = HashMap::new();

        for (source, weight) in sources {
            for (member, score) in source.iter() {
                let weighted = nan_to_zero(score * weight);
                scores
                    .entry(member)
                    .and_modify(|acc| *acc = aggregate.combine(*acc, weighted))
                    .or_insert(weighted);
            }
        }

        SortedSet::from_scores(scores)
    }

    /// Intersection of the weighted `sources`: members of the first source that are present in
    /// every other source.
    pub fn inter(sources: &[(SortedSet, f64)], aggregate: Aggregate) -> SortedSet {
        let Some(((first, first_weight), rest)) = sources.split_first() else {
            return SortedSet::new();
        };

        let mut scores: HashMap<&str, f64> = HashMap::new();

        'members: for (member, score) in first.iter() {
            let mut acc = nan_to_zero(score * first_weight);
            for (source, weight) in rest {
                match source.score(member) {
                    Some(score) => acc = aggregate.combine(acc, nan_to_zero(score * weight)),
                    None => continue 'members,
                }
            }
            scores.insert(member, acc);
        }

        SortedSet::from_scores(scores)
    }

    fn from_scores(scores: HashMap<&str, f64>) -> SortedSet {
        let mut set = SortedSet::new();
        for (member, score) in scores {
            set.add(score, member.to_string());
        }
        set
    }
}

impl FromIterator<(String, f64)> for SortedSet {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut set = SortedSet::new();
        for (member, score) in iter {
            set.add(score, member);
        }
        set
    }
}

fn owned_members(range: Vec<(&str, f64)>) -> Vec<String> {
    range.into_iter().map(|(m, _)| m.to_string()).collect()
}

/// Resolves `start` and `stop` (inclusive, possibly negative) into valid indexes of a sequence of
/// `len` elements. Returns `None` when the range selects nothing.
pub fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(members: &[(&str, f64)]) -> SortedSet {
        members
            .iter()
            .map(|(member, score)| (member.to_string(), *score))
            .collect()
    }

    fn names<'a>(range: &[(&'a str, f64)]) -> Vec<&'a str> {
        range.iter().map(|(member, _)| *member).collect()
    }

    #[test]
    fn add_reports_new_members() {
        let mut set = SortedSet::new();
        assert!(set.add(1.0, "a".to_string()));
        assert!(!set.add(2.0, "a".to_string()));
        assert!(!set.add(2.0, "a".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.score("a"), Some(2.0));
    }

    #[test]
    fn score_update_moves_member_between_buckets() {
        let mut set = build(&[("a", 1.0), ("b", 1.0)]);
        set.add(5.0, "a".to_string());

        assert_eq!(set.iter().collect::<Vec<_>>(), vec![("b", 1.0), ("a", 5.0)]);
        assert_eq!(set.buckets.len(), 2);

        set.add(1.0, "a".to_string());
        assert_eq!(set.buckets.len(), 1);
    }

    #[test]
    fn remove_member() {
        let mut set = build(&[("a", 1.0), ("b", 2.0)]);
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.rank("b"), Some(0));
    }

    #[test]
    fn range_by_rank_with_negative_indexes() {
        let set = build(&[("one", 1.0), ("two", 2.0), ("three", 3.0)]);

        assert_eq!(names(&set.range_by_rank(0, -1, false)), vec!["one", "two", "three"]);
        assert_eq!(names(&set.range_by_rank(0, 1, false)), vec!["one", "two"]);
        assert_eq!(names(&set.range_by_rank(-2, -1, false)), vec!["two", "three"]);
        assert_eq!(names(&set.range_by_rank(0, 0, true)), vec!["three"]);
        assert_eq!(names(&set.range_by_rank(-100, 100, false)).len(), 3);
    }

    #[test]
    fn range_by_rank_out_of_bounds() {
        let set = build(&[("one", 1.0), ("two", 2.0)]);

        assert!(set.range_by_rank(2, 1, false).is_empty());
        assert!(set.range_by_rank(5, 10, false).is_empty());
        assert!(set.range_by_rank(0, -5, false).is_empty());
        assert!(SortedSet::new().range_by_rank(0, -1, false).is_empty());
    }

    #[test]
    fn equal_scores_are_ordered_lexicographically() {
        let set = build(&[("charlie", 1.0), ("alice", 1.0), ("bob", 1.0)]);

        assert_eq!(names(&set.range_by_rank(0, -1, false)), vec!["alice", "bob", "charlie"]);
        assert_eq!(set.rank("alice"), Some(0));
        assert_eq!(set.rank("charlie"), Some(2));
        assert_eq!(set.rev_rank("charlie"), Some(0));
    }

    #[test]
    fn rank_follows_scores() {
        let set = build(&[("v", 0.0), ("v1", 2.0), ("v2", 4.0)]);

        assert_eq!(set.rank("v"), Some(0));
        assert_eq!(set.rank("v1"), Some(1));
        assert_eq!(set.rank("v2"), Some(2));
        assert_eq!(set.rev_rank("v"), Some(2));
        assert_eq!(set.rank("missing"), None);
    }

    #[test]
    fn range_by_score_bounds() {
        let set = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        let inf = ScoreBound::Inclusive(f64::INFINITY);
        let neg_inf = ScoreBound::Inclusive(f64::NEG_INFINITY);

        let range = set.range_by_score(ScoreBound::Inclusive(2.0), ScoreBound::Inclusive(3.0), false, None);
        assert_eq!(names(&range), vec!["b", "c"]);

        let range = set.range_by_score(ScoreBound::Exclusive(2.0), inf, false, None);
        assert_eq!(names(&range), vec!["c", "d"]);

        let range = set.range_by_score(neg_inf, ScoreBound::Exclusive(2.0), false, None);
        assert_eq!(names(&range), vec!["a"]);

        let range = set.range_by_score(neg_inf, inf, true, None);
        assert_eq!(names(&range), vec!["d", "c", "b", "a"]);

        let limit = Some(Limit { offset: 1, count: 2 });
        let range = set.range_by_score(neg_inf, inf, false, limit);
        assert_eq!(names(&range), vec!["b", "c"]);

        let limit = Some(Limit { offset: 1, count: -1 });
        let range = set.range_by_score(neg_inf, inf, false, limit);
        assert_eq!(names(&range), vec!["b", "c", "d"]);
    }

    #[test]
    fn range_by_score_degenerate_bounds() {
        let set = build(&[("a", 1.0), ("b", 2.0), ("c", 2.0), ("d", 3.0)]);

        let range = set.range_by_score(ScoreBound::Exclusive(1.0), ScoreBound::Exclusive(3.0), true, None);
        assert_eq!(names(&range), vec!["c", "b"]);

        let range = set.range_by_score(ScoreBound::Inclusive(2.0), ScoreBound::Inclusive(2.0), false, None);
        assert_eq!(names(&range), vec!["b", "c"]);

        let range = set.range_by_score(ScoreBound::Exclusive(2.0), ScoreBound::Exclusive(2.0), false, None);
        assert!(range.is_empty());
        let range = set.range_by_score(ScoreBound::Inclusive(2.0), ScoreBound::Exclusive(2.0), false, None);
        assert!(range.is_empty());
        let range = set.range_by_score(ScoreBound::Inclusive(3.0), ScoreBound::Inclusive(1.0), false, None);
        assert!(range.is_empty());
    }

    #[test]
    fn range_by_lex_bounds() {
        let set = build(&[("a", 0.0), ("b", 0.0), ("c", 0.0), ("d", 0.0), ("e", 0.0)]);

        let range = set.range_by_lex(&LexBound::Min, &LexBound::Inclusive("c".to_string()), false, None);
        assert_eq!(names(&range), vec!["a", "b", "c"]);

        let range = set.range_by_lex(&LexBound::Exclusive("b".to_string()), &LexBound::Max, false, None);
        assert_eq!(names(&range), vec!["c", "d", "e"]);

        let range = set.range_by_lex(&LexBound::Max, &LexBound::Min, false, None);
        assert!(range.is_empty());

        assert_eq!(set.count_by_lex(&LexBound::Min, &LexBound::Max), 5);
    }

    #[test]
    fn parse_lex_bounds() {
        assert_eq!("[a".parse::<LexBound>(), Ok(LexBound::Inclusive("a".to_string())));
        assert_eq!("(a".parse::<LexBound>(), Ok(LexBound::Exclusive("a".to_string())));
        assert_eq!("-".parse::<LexBound>(), Ok(LexBound::Min));
        assert_eq!("+".parse::<LexBound>(), Ok(LexBound::Max));
        assert_eq!("a".parse::<LexBound>(), Err(CommandError::InvalidRangeItem));
        assert_eq!("".parse::<LexBound>(), Err(CommandError::InvalidRangeItem));
    }

    #[test]
    fn parse_score_bounds() {
        assert_eq!("1.5".parse::<ScoreBound>(), Ok(ScoreBound::Inclusive(1.5)));
        assert_eq!("(1".parse::<ScoreBound>(), Ok(ScoreBound::Exclusive(1.0)));
        assert_eq!("-inf".parse::<ScoreBound>(), Ok(ScoreBound::Inclusive(f64::NEG_INFINITY)));
        assert_eq!("+inf".parse::<ScoreBound>(), Ok(ScoreBound::Inclusive(f64::INFINITY)));
        assert!("abc".parse::<ScoreBound>().is_err());
        assert!("nan".parse::<ScoreBound>().is_err());
    }

    #[test]
    fn remove_ranges() {
        let mut set = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);

        assert_eq!(set.remove_range_by_rank(0, 0), 1);
        assert_eq!(
            set.remove_range_by_score(ScoreBound::Inclusive(3.0), ScoreBound::Inclusive(10.0)),
            2
        );
        assert_eq!(names(&set.range_by_rank(0, -1, false)), vec!["b"]);
    }

    #[test]
    fn pop_min_and_max() {
        let mut set = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);

        assert_eq!(set.pop(1, false), vec![("a".to_string(), 1.0)]);
        assert_eq!(set.pop(5, true), vec![("c".to_string(), 3.0), ("b".to_string(), 2.0)]);
        assert!(set.is_empty());
    }

    #[test]
    fn union_with_weights_and_aggregates() {
        let a = build(&[("x", 1.0), ("y", 2.0)]);
        let b = build(&[("y", 3.0), ("z", 4.0)]);

        let sum = SortedSet::union(&[(a.clone(), 1.0), (b.clone(), 2.0)], Aggregate::Sum);
        assert_eq!(sum.score("x"), Some(1.0));
        assert_eq!(sum.score("y"), Some(8.0));
        assert_eq!(sum.score("z"), Some(8.0));

        let min = SortedSet::union(&[(a.clone(), 1.0), (b.clone(), 1.0)], Aggregate::Min);
        assert_eq!(min.score("y"), Some(2.0));
        assert_eq!(min.score("z"), Some(4.0));

        let max = SortedSet::union(&[(a, 3.0), (b, 1.0)], Aggregate::Max);
        assert_eq!(max.score("y"), Some(6.0));
    }

    #[test]
    fn inter_keeps_members_present_everywhere() {
        let a = build(&[("x", 1.0), ("y", 2.0), ("w", 9.0)]);
        let b = build(&[("y", 3.0), ("x", 4.0)]);
        let c = build(&[("y", 1.0), ("z", 1.0)]);

        let result = SortedSet::inter(&[(a.clone(), 1.0), (b.clone(), 1.0)], Aggregate::Sum);
        assert_eq!(result.len(), 2);
        assert_eq!(result.score("x"), Some(5.0));
        assert_eq!(result.score("y"), Some(5.0));

        let result = SortedSet::inter(&[(a.clone(), 2.0), (b.clone(), 1.0), (c, 1.0)], Aggregate::Max);
        assert_eq!(result.len(), 1);
        assert_eq!(result.score("y"), Some(4.0));

        let result = SortedSet::inter(&[(a, 1.0), (SortedSet::new(), 1.0)], Aggregate::Sum);
        assert!(result.is_empty());
    }

    #[test]
    fn parse_aggregate() {
        assert_eq!("sum".parse::<Aggregate>(), Ok(Aggregate::Sum));
        assert_eq!("MIN".parse::<Aggregate>(), Ok(Aggregate::Min));
        assert_eq!("Max".parse::<Aggregate>(), Ok(Aggregate::Max));
        assert!("avg".parse::<Aggregate>().is_err());
    }
}
