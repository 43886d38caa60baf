//! The stakeholder hand-off chain and its Markdown report.

use gmi_core::{CoreResult, PipelinePlan, PipelineRun, RunStatus};

use crate::roles::AgentRole;

/// Stakeholder → Business Analyst → Domain Expert → Product Manager → Agile PM,
/// addressed by card name.
pub fn stakeholder_plan() -> CoreResult<PipelinePlan> {
    PipelinePlan::new(AgentRole::all().iter().map(|role| role.card_name()))
}

/// Render a finished run as a Markdown report.
pub fn render_report(run: &PipelineRun) -> String {
    let mut out = String::new();
    out.push_str("# GMI Complete Pipeline Results\n\n");

    out.push_str("## Pipeline Execution Summary\n\n");
    out.push_str(&format!(
        "- **Started:** {}\n",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(finished) = run.finished_at {
        out.push_str(&format!(
            "- **Finished:** {}\n",
            finished.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    let status = match &run.status {
        RunStatus::Completed => "Completed".to_string(),
        RunStatus::Running(index) => format!("Running (stage {})", index + 1),
        RunStatus::Aborted { at_index, reason } => format!(
            "Aborted at stage {} ({}): {}",
            at_index + 1,
            run.stages.get(*at_index).map(String::as_str).unwrap_or("unknown"),
            reason
        ),
    };
    out.push_str(&format!("- **Status:** {}\n", status));
    out.push_str(&format!(
        "- **Agents Processed:** {} of {}\n\n",
        run.results.len(),
        run.stages.len()
    ));

    if run.is_completed() {
        out.push_str("## Final Project Execution Plan\n\n");
    } else {
        out.push_str("## Best Available Result\n\n");
        let source = run
            .results
            .last()
            .map(|r| r.stage.as_str())
            .unwrap_or("the original input");
        out.push_str(&format!("> The pipeline stopped early. Output below is from {}.\n\n", source));
    }
    out.push_str(run.output().trim_end());
    out.push_str("\n\n");

    out.push_str("## Processing Trail\n\n");
    for (index, stage) in run.stages.iter().enumerate() {
        let mark = if run.result_for(stage).is_some() {
            "completed"
        } else if run.failed_stage() == Some(stage.as_str()) {
            "failed"
        } else {
            "not run"
        };
        out.push_str(&format!("{}. **{}**: {}\n", index + 1, stage, mark));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gmi_core::StageOutcome;

    fn run(status: RunStatus, completed: usize, output: &str) -> PipelineRun {
        let plan = stakeholder_plan().unwrap();
        let stages = plan.stages().to_vec();
        PipelineRun {
            results: stages
                .iter()
                .take(completed)
                .map(|s| StageOutcome {
                    stage: s.clone(),
                    output: format!("{} output", s),
                })
                .collect(),
            stages,
            current_index: completed,
            carry_payload: output.to_string(),
            status,
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_plan_order() {
        let plan = stakeholder_plan().unwrap();
        assert_eq!(
            plan.stages(),
            &[
                "Stakeholder Requirements Agent",
                "Business Analyst Agent",
                "Domain Expert Agent",
                "Product Manager Agent",
                "Agile Project Manager Agent",
            ]
        );
    }

    #[test]
    fn test_completed_report() {
        let report = render_report(&run(RunStatus::Completed, 5, "# Sprint plan"));
        assert!(report.starts_with("# GMI Complete Pipeline Results"));
        assert!(report.contains("- **Status:** Completed"));
        assert!(report.contains("- **Agents Processed:** 5 of 5"));
        assert!(report.contains("## Final Project Execution Plan\n\n# Sprint plan"));
        assert!(report.contains("5. **Agile Project Manager Agent**: completed"));
    }

    #[test]
    fn test_aborted_report_marks_trail() {
        let status = RunStatus::Aborted {
            at_index: 2,
            reason: "timed out".into(),
        };
        let report = render_report(&run(status, 2, "BRD"));

        assert!(report.contains("Aborted at stage 3 (Domain Expert Agent): timed out"));
        assert!(report.contains("Output below is from Business Analyst Agent."));
        assert!(report.contains("2. **Business Analyst Agent**: completed"));
        assert!(report.contains("3. **Domain Expert Agent**: failed"));
        assert!(report.contains("4. **Product Manager Agent**: not run"));
    }

    #[test]
    fn test_first_stage_failure_uses_original_input() {
        let status = RunStatus::Aborted {
            at_index: 0,
            reason: "down".into(),
        };
        let report = render_report(&run(status, 0, "We need a portal"));
        assert!(report.contains("Output below is from the original input."));
        assert!(report.contains("We need a portal"));
    }
}
