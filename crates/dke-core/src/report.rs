//! Assessment report types with JSON persistence and progress comparison.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gaps::StudyPlan;
use crate::grading::Rubric;
use crate::model::{BktParams, CatConfig, ItemBank};
use crate::pipeline::AssessmentResult;

/// A complete assessment report for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Learner identifier.
    pub learner: String,
    /// Summary of the item bank (without the items themselves).
    pub bank: BankSummary,
    /// Policy the session ran under.
    pub config: SessionConfig,
    pub result: AssessmentResult,
    pub study_plan: StudyPlan,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of an item bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSummary {
    pub id: String,
    pub name: String,
    pub item_count: usize,
    pub skills: Vec<String>,
}

impl BankSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bank: &ItemBank) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_count: bank.len(),
            skills: bank.skills(),
        }
    }
}

/// Settings recorded alongside a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cat: CatConfig,
    pub bkt: BktParams,
    /// Rubric the free-text response was graded against.
    #[serde(default)]
    pub rubric: Rubric,
    /// Name of the grader used for the free-text response.
    pub grader: String,
}

impl SessionConfig {
    pub fn rubric_weight(&self, criterion: &str) -> Option<f64> {
        self.rubric.weights.get(criterion).copied()
    }
}

impl AssessmentReport {
    /// Wrap a finished assessment in a new report with a fresh id.
    pub fn new(
        learner: impl Into<String>,
        bank: BankSummary,
        config: SessionConfig,
        result: AssessmentResult,
        study_plan: StudyPlan,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            learner: learner.into(),
            bank,
            config,
            result,
            study_plan,
            duration_ms,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AssessmentReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Compare this report's mastery against an earlier `baseline`.
    ///
    /// A skill counts as changed only when its mastery moved by more than
    /// `threshold`.
    pub fn compare(&self, baseline: &AssessmentReport, threshold: f64) -> ProgressReport {
        let before = &baseline.result.mastery;
        let after = &self.result.mastery;

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_skills = Vec::new();

        for (skill, &current) in after {
            let Some(&baseline_val) = before.get(skill) else {
                new_skills.push(skill.clone());
                continue;
            };
            let change = MasteryChange {
                skill: skill.clone(),
                baseline: baseline_val,
                current,
                delta: current - baseline_val,
            };
            if change.delta < -threshold {
                regressions.push(change);
            } else if change.delta > threshold {
                improvements.push(change);
            } else {
                unchanged += 1;
            }
        }

        let dropped_skills = before
            .keys()
            .filter(|k| !after.contains_key(*k))
            .cloned()
            .collect();

        ProgressReport {
            learner: self.learner.clone(),
            regressions,
            improvements,
            unchanged,
            new_skills,
            dropped_skills,
            theta_delta: self.result.theta - baseline.result.theta,
            overall_delta: self.result.overall - baseline.result.overall,
        }
    }

    /// Final mastery keyed by skill.
    pub fn mastery(&self) -> &BTreeMap<String, f64> {
        &self.result.mastery
    }
}

/// Result of comparing two assessments of the same learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub learner: String,
    /// Skills whose mastery went down.
    pub regressions: Vec<MasteryChange>,
    /// Skills whose mastery went up.
    pub improvements: Vec<MasteryChange>,
    /// Skills with no significant change.
    pub unchanged: usize,
    /// Skills in current but not baseline.
    pub new_skills: Vec<String>,
    /// Skills in baseline but not current.
    pub dropped_skills: Vec<String>,
    pub theta_delta: f64,
    /// Change in the weighted rubric score.
    pub overall_delta: f64,
}

/// Mastery movement for one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryChange {
    pub skill: String,
    pub baseline: f64,
    pub current: f64,
    pub delta: f64,
}

impl ProgressReport {
    /// Format the progress report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged (θ {:+.3}, rubric {:+.1}%)\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged,
            self.theta_delta,
            self.overall_delta * 100.0
        ));

        let mut table = |title: &str, changes: &[MasteryChange]| {
            if changes.is_empty() {
                return;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Skill | Baseline | Current | Delta |\n");
            md.push_str("|-------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1}% |\n",
                    c.skill,
                    c.baseline * 100.0,
                    c.current * 100.0,
                    c.delta * 100.0
                ));
            }
            md.push('\n');
        };
        table("Regressions", &self.regressions);
        table("Improvements", &self.improvements);

        if !self.new_skills.is_empty() {
            md.push_str(&format!("New skills: {}\n", self.new_skills.join(", ")));
        }
        if !self.dropped_skills.is_empty() {
            md.push_str(&format!("Dropped skills: {}\n", self.dropped_skills.join(", ")));
        }

        md
    }

    /// Returns true if any skill lost mastery beyond the threshold.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StopReason;
    use crate::pipeline::Dashboard;

    fn make_result(theta: f64, mastery: &[(&str, f64)]) -> AssessmentResult {
        let mastery: BTreeMap<String, f64> =
            mastery.iter().map(|&(s, m)| (s.to_string(), m)).collect();
        AssessmentResult {
            theta,
            theta_se: f64::INFINITY,
            stop_reason: StopReason::MaxItems,
            item_log: vec![],
            mastery: mastery.clone(),
            criteria: BTreeMap::new(),
            overall: 0.5,
            self_assessment: BTreeMap::new(),
            concept_map_score: 0.5,
            dashboard: Dashboard {
                ability_estimate: theta,
                ability_se: f64::INFINITY,
                mastery,
                criteria: BTreeMap::new(),
                overall: 0.5,
                self_assessment: BTreeMap::new(),
                concept_map_score: 0.5,
                recommendations: vec![],
            },
        }
    }

    fn make_report(theta: f64, mastery: &[(&str, f64)]) -> AssessmentReport {
        let result = make_result(theta, mastery);
        let plan = StudyPlan::build(result.theta, &result.mastery, None);
        AssessmentReport::new(
            "learner-1",
            BankSummary {
                id: "test".into(),
                name: "Test".into(),
                item_count: 3,
                skills: vec!["algebra".into()],
            },
            SessionConfig {
                cat: CatConfig::default(),
                bkt: BktParams::default(),
                rubric: Rubric::default(),
                grader: "keyword".into(),
            },
            result,
            plan,
            0,
        )
    }

    #[test]
    fn compare_identical_reports() {
        let baseline = make_report(0.0, &[("algebra", 0.5)]);
        let current = make_report(0.0, &[("algebra", 0.52)]);

        let report = current.compare(&baseline, 0.05);
        assert!(report.regressions.is_empty());
        assert!(report.improvements.is_empty());
        assert_eq!(report.unchanged, 1);
        assert!(!report.has_regressions());
    }

    #[test]
    fn compare_with_regression_and_improvement() {
        let baseline = make_report(0.4, &[("algebra", 0.7), ("probability", 0.3)]);
        let current = make_report(-0.1, &[("algebra", 0.4), ("probability", 0.6)]);

        let report = current.compare(&baseline, 0.05);
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].skill, "algebra");
        assert_eq!(report.improvements[0].skill, "probability");
        assert!((report.theta_delta + 0.5).abs() < 1e-12);
        assert!(report.has_regressions());
    }

    #[test]
    fn compare_with_new_and_dropped_skills() {
        let baseline = make_report(0.0, &[("sets", 0.5)]);
        let current = make_report(0.0, &[("functions", 0.5)]);

        let report = current.compare(&baseline, 0.05);
        assert_eq!(report.new_skills, vec!["functions"]);
        assert_eq!(report.dropped_skills, vec!["sets"]);
    }

    #[test]
    fn json_roundtrip_keeps_infinite_se() {
        let report = make_report(0.25, &[("algebra", 0.61)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        report.save_json(&path).unwrap();
        let loaded = AssessmentReport::load_json(&path).unwrap();

        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.learner, "learner-1");
        assert!(loaded.result.theta_se.is_infinite());
        assert_eq!(loaded.study_plan.gaps.len(), 1);
        assert_eq!(loaded.study_plan.gaps[0].skill, "algebra");
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AssessmentReport::load_json(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse report JSON"));
    }

    #[test]
    fn markdown_output() {
        let baseline = make_report(0.0, &[("algebra", 0.9)]);
        let current = make_report(0.0, &[("algebra", 0.3)]);

        let md = current.compare(&baseline, 0.05).to_markdown();
        assert!(md.contains("### Regressions"));
        assert!(md.contains("| algebra | 90.0% | 30.0% | -60.0% |"));
    }
}
