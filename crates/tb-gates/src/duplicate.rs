// duplicate.rs — Duplicate-call intelligence for read-only events.
//
// A repeated read is not automatically waste: re-reading a file after it
// changed is verification, and re-reading after a long gap is a
// deliberate context refresh. Only repeats that are neither get a waste
// estimate attached. This gate is advisory: it annotates, never blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tb_event::ClassifiedEvent;

use crate::config::GateConfig;
use crate::scope::ModifiedFile;
use crate::verdict::{Detail, GateAnnotation, Verdict};

/// Name of this gate in annotations.
pub const GATE: &str = "duplicate_call";

/// Per-signature history: when this exact call was last seen and how
/// often it has occurred this session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRecord {
    pub last_seen_at: DateTime<Utc>,
    pub occurrence_count: u64,
}

/// How a repeat was judged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Not a repeat at all.
    FirstOccurrence,
    /// The target changed since the previous read; re-reading is correct.
    VerificationAfterModification,
    /// Enough time passed that this is an intentional context refresh.
    StaleContextRefresh,
    /// A repeat with no justification; costed and counted.
    Wasteful,
}

impl Classification {
    /// Whether this repeat is justified.
    pub fn is_legitimate(self) -> bool {
        !matches!(self, Classification::Wasteful)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::FirstOccurrence => "first_occurrence",
            Classification::VerificationAfterModification => "verification_after_modification",
            Classification::StaleContextRefresh => "stale_context_refresh",
            Classification::Wasteful => "wasteful",
        };
        write!(f, "{s}")
    }
}

/// Result of analyzing one read-only event.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateAnalysis {
    pub classification: Classification,
    /// Occurrence count including this call.
    pub occurrence_count: u64,
    /// Estimated cost of this repeat (zero unless wasteful).
    pub estimated_waste: u64,
}

/// Derive the duplicate signature: SHA-256 over the lowercased tool name
/// and the canonical JSON of its parameters (serde_json maps serialize
/// with sorted keys, so parameter order cannot perturb the signature).
pub fn signature(event: &ClassifiedEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event.event.tool_name.to_ascii_lowercase().as_bytes());
    hasher.update(b"\x00");
    let params = serde_json::to_string(&event.event.parameters).unwrap_or_default();
    hasher.update(params.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classify a read-only event against its call history. Pure: the
/// dispatcher supplies the prior record, the modified-files list, and the
/// evaluation time.
pub fn analyze(
    event: &ClassifiedEvent,
    previous: Option<&CallRecord>,
    modified_files: &[ModifiedFile],
    config: &GateConfig,
    now: DateTime<Utc>,
) -> DuplicateAnalysis {
    let Some(previous) = previous else {
        return DuplicateAnalysis {
            classification: Classification::FirstOccurrence,
            occurrence_count: 1,
            estimated_waste: 0,
        };
    };
    let occurrence_count = previous.occurrence_count + 1;

    // A read of a path written after the previous read of this signature
    // is verification, regardless of how quickly it follows.
    let verification = event.target_path.as_deref().is_some_and(|path| {
        modified_files
            .iter()
            .any(|m| m.path == path && m.modified_at > previous.last_seen_at)
    });
    if verification {
        return DuplicateAnalysis {
            classification: Classification::VerificationAfterModification,
            occurrence_count,
            estimated_waste: 0,
        };
    }

    let elapsed = now.signed_duration_since(previous.last_seen_at).num_seconds();
    if elapsed >= config.staleness_seconds as i64 {
        return DuplicateAnalysis {
            classification: Classification::StaleContextRefresh,
            occurrence_count,
            estimated_waste: 0,
        };
    }

    DuplicateAnalysis {
        classification: Classification::Wasteful,
        occurrence_count,
        estimated_waste: config.waste_estimate_for(&event.event.tool_name),
    }
}

/// Build the advisory annotation for a repeat. First occurrences produce
/// no annotation; the verdict is always ALLOW (this gate never blocks).
pub fn annotation(
    analysis: &DuplicateAnalysis,
    session_waste_estimate: u64,
) -> Option<GateAnnotation> {
    if analysis.classification == Classification::FirstOccurrence {
        return None;
    }

    let (explanation, suggestion) = match analysis.classification {
        Classification::Wasteful => (
            format!(
                "repeat #{} of an identical read with no intervening change \
                 (~{} tokens wasted, ~{} this session)",
                analysis.occurrence_count, analysis.estimated_waste, session_waste_estimate,
            ),
            Some(format!(
                "reuse the result of occurrence #{} instead of re-reading",
                analysis.occurrence_count - 1,
            )),
        ),
        other => (
            format!("repeated read classified as {other}, not waste"),
            None,
        ),
    };

    Some(
        GateAnnotation::new(GATE, Verdict::Allow, explanation).with_detail(
            Detail::DuplicateCall {
                classification: analysis.classification.to_string(),
                occurrence_count: analysis.occurrence_count,
                estimated_waste: analysis.estimated_waste,
                session_waste_estimate,
                suggestion,
            },
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tb_event::{classify, ToolCallEvent};

    fn read_event(path: &str) -> ClassifiedEvent {
        classify(ToolCallEvent::from_value(json!({
            "tool_name": "read_file",
            "parameters": { "file_path": path }
        })))
    }

    fn record(seen_secs_ago: i64, now: DateTime<Utc>) -> CallRecord {
        CallRecord {
            last_seen_at: now - Duration::seconds(seen_secs_ago),
            occurrence_count: 1,
        }
    }

    #[test]
    fn signature_stable_across_parameter_order() {
        let a = classify(ToolCallEvent::from_value(json!({
            "tool_name": "read_file",
            "parameters": { "file_path": "a.rs", "limit": 10 }
        })));
        let b = classify(ToolCallEvent::from_value(json!({
            "tool_name": "read_file",
            "parameters": { "limit": 10, "file_path": "a.rs" }
        })));
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn signature_differs_by_tool_and_params() {
        let read = read_event("a.rs");
        let other_path = read_event("b.rs");
        assert_ne!(signature(&read), signature(&other_path));
    }

    #[test]
    fn first_occurrence_is_not_annotated() {
        let config = GateConfig::default();
        let now = Utc::now();
        let analysis = analyze(&read_event("a.rs"), None, &[], &config, now);
        assert_eq!(analysis.classification, Classification::FirstOccurrence);
        assert!(annotation(&analysis, 0).is_none());
    }

    #[test]
    fn fast_identical_repeat_is_wasteful() {
        let config = GateConfig::default();
        let now = Utc::now();
        let prev = record(5, now);
        let analysis = analyze(&read_event("a.rs"), Some(&prev), &[], &config, now);

        assert_eq!(analysis.classification, Classification::Wasteful);
        assert_eq!(analysis.occurrence_count, 2);
        assert_eq!(analysis.estimated_waste, 800); // read_file estimate
    }

    #[test]
    fn staleness_boundary_one_second_each_side() {
        let config = GateConfig::default(); // 120s threshold
        let now = Utc::now();

        let just_under = record(119, now);
        let analysis = analyze(&read_event("a.rs"), Some(&just_under), &[], &config, now);
        assert_eq!(analysis.classification, Classification::Wasteful);

        let just_over = record(121, now);
        let analysis = analyze(&read_event("a.rs"), Some(&just_over), &[], &config, now);
        assert_eq!(analysis.classification, Classification::StaleContextRefresh);
    }

    #[test]
    fn read_after_modification_is_verification_regardless_of_elapsed() {
        let config = GateConfig::default();
        let now = Utc::now();
        let prev = record(1, now); // one second ago: far inside the waste window
        let modified = vec![ModifiedFile {
            path: "a.rs".to_string(),
            modified_at: now,
        }];

        let analysis = analyze(&read_event("a.rs"), Some(&prev), &modified, &config, now);
        assert_eq!(
            analysis.classification,
            Classification::VerificationAfterModification
        );
        assert_eq!(analysis.estimated_waste, 0);
    }

    #[test]
    fn modification_before_previous_read_does_not_justify() {
        let config = GateConfig::default();
        let now = Utc::now();
        let prev = record(5, now);
        // File was modified BEFORE the previous read: already seen.
        let modified = vec![ModifiedFile {
            path: "a.rs".to_string(),
            modified_at: now - Duration::seconds(60),
        }];

        let analysis = analyze(&read_event("a.rs"), Some(&prev), &modified, &config, now);
        assert_eq!(analysis.classification, Classification::Wasteful);
    }

    #[test]
    fn wasteful_annotation_suggests_reuse_by_occurrence() {
        let analysis = DuplicateAnalysis {
            classification: Classification::Wasteful,
            occurrence_count: 3,
            estimated_waste: 400,
        };
        let ann = annotation(&analysis, 1200).unwrap();
        assert_eq!(ann.verdict, Verdict::Allow); // advisory, never blocks
        match ann.detail {
            Some(Detail::DuplicateCall {
                suggestion: Some(s),
                session_waste_estimate,
                ..
            }) => {
                assert!(s.contains("occurrence #2"));
                assert_eq!(session_waste_estimate, 1200);
            }
            other => panic!("expected DuplicateCall with suggestion, got {other:?}"),
        }
    }

    // Labeled mini-trace: the classifier must stay under a 20%
    // false-positive rate (legitimate repeats mislabeled wasteful).
    #[test]
    fn false_positive_rate_under_20_percent_on_labeled_trace() {
        let config = GateConfig::default();
        let now = Utc::now();
        let modified = vec![ModifiedFile {
            path: "src/lib.rs".to_string(),
            modified_at: now - Duration::seconds(10),
        }];

        // (event, previous record, expected-legitimate)
        let labeled: Vec<(ClassifiedEvent, CallRecord, bool)> = vec![
            // Verification after the write above.
            (read_event("src/lib.rs"), record(30, now), true),
            // Context refresh after a long gap.
            (read_event("README.md"), record(600, now), true),
            (read_event("Cargo.toml"), record(121, now), true),
            // Tight-loop repeats with nothing changed.
            (read_event("src/main.rs"), record(3, now), false),
            (read_event("src/main.rs"), record(8, now), false),
            (read_event("docs/spec.md"), record(40, now), false),
        ];

        let mut false_positives = 0;
        let mut legitimate_total = 0;
        for (event, prev, expect_legitimate) in &labeled {
            let analysis = analyze(event, Some(prev), &modified, &config, now);
            if *expect_legitimate {
                legitimate_total += 1;
                if !analysis.classification.is_legitimate() {
                    false_positives += 1;
                }
            }
        }

        let rate = false_positives as f64 / legitimate_total as f64;
        assert!(rate < 0.2, "false-positive rate {rate} exceeds 20%");
    }
}
