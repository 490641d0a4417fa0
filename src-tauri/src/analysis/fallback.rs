//! Simulated posture analysis used whenever the analysis service is unavailable.
//!
//! Each rule takes its own uniform draw in `[0, 1)` and fires when the draw
//! exceeds the rule's threshold. Draws come from a caller-supplied closure so
//! tests can script them; production callers use the thread-local RNG.

use rand::Rng;

use super::types::{tags, AnalysisResult, PostureIssue, Sensitivity, Severity};

/// Spacing between synthesized upload results, in seconds.
pub const SAMPLE_STEP_SECS: f64 = 0.5;

/// Frame rate assumed when numbering synthesized upload results.
pub const ASSUMED_FPS: f64 = 30.0;

/// Duration used when the player has not reported a usable one.
pub const DEFAULT_VIDEO_DURATION_SECS: f64 = 10.0;

struct Rule {
    tag: &'static str,
    message: &'static str,
    severity: Severity,
}

const NECK_FORWARD: Rule = Rule {
    tag: tags::NECK_FORWARD,
    message: "Forward head posture detected - align your head over shoulders",
    severity: Severity::Medium,
};

const BACK_SLOUCH: Rule = Rule {
    tag: tags::BACK_SLOUCH,
    message: "Slouching detected - straighten your back and engage core",
    severity: Severity::High,
};

const KNEE_OVER_TOE: Rule = Rule {
    tag: tags::KNEE_OVER_TOE,
    message: "Knee passing over toe in squat - shift weight back",
    severity: Severity::High,
};

const UNEVEN_SHOULDERS: Rule = Rule {
    tag: tags::UNEVEN_SHOULDERS,
    message: "Uneven shoulders detected - level your shoulders",
    severity: Severity::Low,
};

/// Number of rules evaluated per live cycle.
pub const LIVE_RULE_COUNT: usize = 3;

/// Number of rules evaluated per synthesized upload result.
pub const UPLOAD_RULE_COUNT: usize = 4;

/// Live rules as (rule, offset above the sensitivity's base threshold).
static LIVE_RULES: [(Rule, f64); LIVE_RULE_COUNT] = [(NECK_FORWARD, 0.0), (BACK_SLOUCH, 0.05), (UNEVEN_SHOULDERS, 0.1)];

/// Upload rules as (rule, fixed threshold).
static UPLOAD_RULES: [(Rule, f64); UPLOAD_RULE_COUNT] = [
    (NECK_FORWARD, 0.7),
    (BACK_SLOUCH, 0.8),
    (KNEE_OVER_TOE, 0.85),
    (UNEVEN_SHOULDERS, 0.9),
];

fn evaluate<F>(rules: impl Iterator<Item = (&'static Rule, f64)>, draw: &mut F) -> Vec<PostureIssue>
where
    F: FnMut() -> f64,
{
    rules
        .filter(|(_, threshold)| draw() > *threshold)
        .map(|(rule, _)| PostureIssue::new(rule.tag, rule.message, rule.severity))
        .collect()
}

/// Simulated issues for one live frame.
pub fn frame_issues<F>(sensitivity: Sensitivity, draw: &mut F) -> Vec<PostureIssue>
where
    F: FnMut() -> f64,
{
    let base = sensitivity.base_threshold();
    evaluate(
        LIVE_RULES.iter().map(|(rule, offset)| (rule, base + offset)),
        draw,
    )
}

/// Simulated results covering `[0, duration)` at [`SAMPLE_STEP_SECS`].
pub fn video_results<F>(duration: f64, draw: &mut F) -> Vec<AnalysisResult>
where
    F: FnMut() -> f64,
{
    let samples = (duration / SAMPLE_STEP_SECS).ceil().max(0.0) as usize;

    (0..samples)
        .map(|i| {
            let timestamp = i as f64 * SAMPLE_STEP_SECS;
            AnalysisResult {
                frame_number: (timestamp * ASSUMED_FPS).floor() as u64,
                timestamp,
                posture_issues: evaluate(UPLOAD_RULES.iter().map(|(rule, t)| (rule, *t)), &mut *draw),
                pose_detected: true,
            }
        })
        .collect()
}

/// Clamp a player-reported duration to something the generator can span.
pub fn effective_duration(duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => DEFAULT_VIDEO_DURATION_SECS,
    }
}

/// [`frame_issues`] driven by the thread-local RNG.
pub fn simulate_frame(sensitivity: Sensitivity) -> Vec<PostureIssue> {
    let mut rng = rand::rng();
    frame_issues(sensitivity, &mut || rng.random::<f64>())
}

/// [`video_results`] driven by the thread-local RNG.
pub fn simulate_video(duration: f64) -> Vec<AnalysisResult> {
    let mut rng = rand::rng();
    video_results(duration, &mut || rng.random::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(values: Vec<f64>) -> impl FnMut() -> f64 {
        let mut iter = values.into_iter();
        move || iter.next().expect("ran out of scripted draws")
    }

    #[test]
    fn test_frame_issues_medium_thresholds() {
        // neck 0.8, slouch 0.85, shoulders 0.9
        let mut draw = scripted(vec![0.81, 0.85, 0.95]);
        let issues = frame_issues(Sensitivity::Medium, &mut draw);

        let types: Vec<_> = issues.iter().map(|i| i.issue_type.as_str()).collect();
        assert_eq!(types, vec![tags::NECK_FORWARD, tags::UNEVEN_SHOULDERS]);
    }

    #[test]
    fn test_frame_issues_high_sensitivity_fires_more() {
        let mut draw = scripted(vec![0.7, 0.7, 0.71]);
        let issues = frame_issues(Sensitivity::High, &mut draw);
        assert_eq!(issues.len(), 3);

        let mut draw = scripted(vec![0.7, 0.7, 0.71]);
        assert!(frame_issues(Sensitivity::Low, &mut draw).is_empty());
    }

    #[test]
    fn test_frame_issue_severities_fixed() {
        let mut draw = scripted(vec![0.99, 0.99, 0.99]);
        let issues = frame_issues(Sensitivity::Medium, &mut draw);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[1].severity, Severity::High);
        assert_eq!(issues[2].severity, Severity::Low);
    }

    #[test]
    fn test_video_results_three_seconds() {
        let mut draw = || 0.0;
        let results = video_results(3.0, &mut draw);

        let timestamps: Vec<f64> = results.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        assert_eq!(results[3].frame_number, 45);
        assert!(results.iter().all(|r| r.pose_detected && r.posture_issues.is_empty()));
    }

    #[test]
    fn test_video_results_partial_step_included() {
        let mut draw = || 0.0;
        let results = video_results(3.1, &mut draw);
        assert_eq!(results.len(), 7);
        assert_eq!(results.last().unwrap().timestamp, 3.0);
    }

    #[test]
    fn test_video_results_uses_fixed_upload_thresholds() {
        // neck 0.7, slouch 0.8, knee 0.85, shoulders 0.9
        let mut draw = scripted(vec![0.75, 0.79, 0.86, 0.9]);
        let results = video_results(0.5, &mut draw);

        let types: Vec<_> = results[0]
            .posture_issues
            .iter()
            .map(|i| i.issue_type.as_str())
            .collect();
        assert_eq!(types, vec![tags::NECK_FORWARD, tags::KNEE_OVER_TOE]);
    }

    #[test]
    fn test_simulated_output_shape() {
        for sensitivity in [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High] {
            for _ in 0..200 {
                let issues = simulate_frame(sensitivity);
                assert!(issues.len() <= LIVE_RULE_COUNT);
                assert!(issues
                    .iter()
                    .all(|i| tags::KNOWN.contains(&i.issue_type.as_str())));
            }
        }

        for result in simulate_video(20.0) {
            assert!(result.posture_issues.len() <= UPLOAD_RULE_COUNT);
            assert!(result
                .posture_issues
                .iter()
                .all(|i| tags::KNOWN.contains(&i.issue_type.as_str())));
        }
    }

    #[test]
    fn test_effective_duration() {
        assert_eq!(effective_duration(Some(3.0)), 3.0);
        assert_eq!(effective_duration(Some(f64::NAN)), DEFAULT_VIDEO_DURATION_SECS);
        assert_eq!(effective_duration(Some(0.0)), DEFAULT_VIDEO_DURATION_SECS);
        assert_eq!(effective_duration(None), DEFAULT_VIDEO_DURATION_SECS);
    }
}
