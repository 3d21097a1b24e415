//! Version comparison for the up-to-date decision.
//!
//! Versions are compared as semver where possible. Short cores such as `1.2`
//! are padded with zeros, so `1.2 == 1.2.0`, and pre-release suffixes sort
//! below the release they precede. Anything semver cannot represent (four
//! segments, odd separators) falls back to a segment-wise comparison.

use semver::{BuildMetadata, Version};
use std::cmp::Ordering;

/// Strip surrounding whitespace and any leading `v` from a tag or version.
pub fn normalize(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// Returns true when `installed` is the same as or newer than `latest`.
pub fn is_at_least(installed: &str, latest: &str) -> bool {
    compare(installed, latest) != Ordering::Less
}

pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => compare_segments(normalize(a), normalize(b)),
    }
}

// Build metadata never affects precedence
fn parse_lenient(version: &str) -> Option<Version> {
    parse_core(version).map(|mut parsed| {
        parsed.build = BuildMetadata::EMPTY;
        parsed
    })
}

fn parse_core(version: &str) -> Option<Version> {
    let version = normalize(version);
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let (core, suffix) = match version.find(|c: char| c == '-' || c == '+') {
        Some(pos) => version.split_at(pos),
        None => (version, ""),
    };

    let parts: Vec<u64> = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let segment = |i: usize| parts.get(i).copied().unwrap_or(0);
    Version::parse(&format!(
        "{}.{}.{}{}",
        segment(0),
        segment(1),
        segment(2),
        suffix
    ))
    .ok()
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Label(&'a str),
}

fn segments(version: &str) -> Vec<Segment<'_>> {
    version
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Label(s),
        })
        .collect()
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let a = segments(a);
    let b = segments(b);

    for i in 0..a.len().max(b.len()) {
        let ordering = match (a.get(i), b.get(i)) {
            (Some(Segment::Number(x)), Some(Segment::Number(y))) => x.cmp(y),
            (Some(Segment::Label(x)), Some(Segment::Label(y))) => x.cmp(y),
            // A release number outranks a pre-release label in the same position
            (Some(Segment::Number(_)), Some(Segment::Label(_))) => Ordering::Greater,
            (Some(Segment::Label(_)), Some(Segment::Number(_))) => Ordering::Less,
            (Some(Segment::Number(x)), None) => x.cmp(&0),
            (None, Some(Segment::Number(y))) => 0.cmp(y),
            (Some(Segment::Label(_)), None) => Ordering::Less,
            (None, Some(Segment::Label(_))) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}
