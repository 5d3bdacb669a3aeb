//! Insights endpoints: workflow and job metrics for a project.
//!
//! Every endpoint comes in two forms. The `*_raw` method validates its
//! parameters, sends the request and hands back the unread
//! [`reqwest::Response`]. The plain method reads and releases that response
//! and decodes it through the client's response pipeline.
//!
//! Project slugs look like `gh/org/repo` and are used as-is in the path.

use crate::{context::Context, metadata::RequestMetadata, Client, Error, Response, Result};
use http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Instant;

/// Recent runs of a single workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRuns {
    /// Runs, most recent first.
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<WorkflowRun>,
    /// Token for the next page, when there is one.
    pub next_page_token: Option<String>,
}

/// One run of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRun {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    /// Seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub duration: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stopped_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub credits_used: u64,
}

/// Aggregated metrics for every workflow of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSummaries {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<WorkflowSummary>,
    pub next_page_token: Option<String>,
}

/// Aggregated metrics for one workflow over a reporting window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: WorkflowMetrics,
    #[serde(deserialize_with = "null_as_default")]
    pub window_start: String,
    #[serde(deserialize_with = "null_as_default")]
    pub window_end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowMetrics {
    /// Between 0 and 1.
    #[serde(deserialize_with = "null_as_default")]
    pub success_rate: f64,
    /// Average runs per day.
    #[serde(deserialize_with = "null_as_default")]
    pub throughput: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_runs: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub failed_runs: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub successful_runs: u64,
    /// Mean time to recovery, in seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub mttr: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_credits_used: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_metrics: DurationMetrics,
}

/// Run duration statistics, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationMetrics {
    #[serde(deserialize_with = "null_as_default")]
    pub min: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub max: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub median: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub mean: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub p95: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub standard_deviation: f64,
}

/// Aggregated metrics for every job of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSummaries {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<JobSummary>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: JobMetrics,
    #[serde(deserialize_with = "null_as_default")]
    pub window_start: String,
    #[serde(deserialize_with = "null_as_default")]
    pub window_end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobMetrics {
    #[serde(deserialize_with = "null_as_default")]
    pub success_rate: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub throughput: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_runs: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub failed_runs: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub successful_runs: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_credits_used: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_metrics: DurationMetrics,
}

/// Recent runs of a single job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRuns {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<JobRun>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRun {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub started_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stopped_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub credits_used: u64,
}

/// Decodes `null` as the field type's default, the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn require(value: &str, name: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingParameter(name));
    }
    Ok(())
}

fn insights_get(path: String, branch: Option<&str>) -> RequestMetadata {
    RequestMetadata::new(Method::GET, path).with_optional_query_param("branch", branch)
}

impl Client {
    /// `GET /insights/{project_slug}/workflows/{workflow_name}`, body unread.
    ///
    /// `branch` is sent only when present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] without sending anything when the
    /// project slug or workflow name is empty.
    pub async fn workflow_runs_raw(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        branch: Option<&str>,
    ) -> Result<reqwest::Response> {
        require(project_slug, "project slug")?;
        require(workflow_name, "workflow name")?;

        let metadata = insights_get(
            format!("/insights/{}/workflows/{}", project_slug, workflow_name),
            branch,
        );
        self.send_raw::<()>(ctx, metadata, None).await
    }

    /// Recent runs of a workflow.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use circleci_v2::{Client, Context};
    ///
    /// # async fn example() -> Result<(), circleci_v2::Error> {
    /// let client = Client::new("my-token");
    /// let runs = client
    ///     .workflow_runs(&Context::background(), "gh/org/repo", "build", Some("main"))
    ///     .await?;
    /// let failed = runs.items.iter().filter(|run| run.status == "failed").count();
    /// println!("{} of {} runs failed", failed, runs.items.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn workflow_runs(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        branch: Option<&str>,
    ) -> Result<Response<WorkflowRuns>> {
        let start_time = Instant::now();
        let response = self
            .workflow_runs_raw(ctx, project_slug, workflow_name, branch)
            .await?;
        self.decode(ctx, response, start_time).await
    }

    /// `GET /insights/{project_slug}/workflows`, body unread.
    pub async fn workflow_summaries_raw(
        &self,
        ctx: &Context,
        project_slug: &str,
        branch: Option<&str>,
    ) -> Result<reqwest::Response> {
        require(project_slug, "project slug")?;

        let metadata = insights_get(format!("/insights/{}/workflows", project_slug), branch);
        self.send_raw::<()>(ctx, metadata, None).await
    }

    /// Aggregated metrics for each workflow of a project.
    pub async fn workflow_summaries(
        &self,
        ctx: &Context,
        project_slug: &str,
        branch: Option<&str>,
    ) -> Result<Response<WorkflowSummaries>> {
        let start_time = Instant::now();
        let response = self
            .workflow_summaries_raw(ctx, project_slug, branch)
            .await?;
        self.decode(ctx, response, start_time).await
    }

    /// `GET /insights/{project_slug}/workflows/{workflow_name}/jobs`, body unread.
    pub async fn job_summaries_raw(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        branch: Option<&str>,
    ) -> Result<reqwest::Response> {
        require(project_slug, "project slug")?;
        require(workflow_name, "workflow name")?;

        let metadata = insights_get(
            format!("/insights/{}/workflows/{}/jobs", project_slug, workflow_name),
            branch,
        );
        self.send_raw::<()>(ctx, metadata, None).await
    }

    /// Aggregated metrics for each job of a workflow.
    pub async fn job_summaries(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        branch: Option<&str>,
    ) -> Result<Response<JobSummaries>> {
        let start_time = Instant::now();
        let response = self
            .job_summaries_raw(ctx, project_slug, workflow_name, branch)
            .await?;
        self.decode(ctx, response, start_time).await
    }

    /// `GET /insights/{project_slug}/workflows/{workflow_name}/jobs/{job_name}`, body unread.
    pub async fn job_runs_raw(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        job_name: &str,
        branch: Option<&str>,
    ) -> Result<reqwest::Response> {
        require(project_slug, "project slug")?;
        require(workflow_name, "workflow name")?;
        require(job_name, "job name")?;

        let metadata = insights_get(
            format!(
                "/insights/{}/workflows/{}/jobs/{}",
                project_slug, workflow_name, job_name
            ),
            branch,
        );
        self.send_raw::<()>(ctx, metadata, None).await
    }

    /// Recent runs of a job.
    pub async fn job_runs(
        &self,
        ctx: &Context,
        project_slug: &str,
        workflow_name: &str,
        job_name: &str,
        branch: Option<&str>,
    ) -> Result<Response<JobRuns>> {
        let start_time = Instant::now();
        let response = self
            .job_runs_raw(ctx, project_slug, workflow_name, job_name, branch)
            .await?;
        self.decode(ctx, response, start_time).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fields_decode_as_defaults() {
        let run: WorkflowRun = serde_json::from_str(
            r#"{"id":"a","status":"running","duration":null,"created_at":"c","stopped_at":null,"credits_used":null}"#,
        )
        .unwrap();

        assert_eq!(run.status, "running");
        assert_eq!(run.duration, 0);
        assert_eq!(run.stopped_at, "");
        assert_eq!(run.credits_used, 0);

        let summary: WorkflowSummary =
            serde_json::from_str(r#"{"name":"build","metrics":{"mttr":null,"duration_metrics":null}}"#).unwrap();
        assert_eq!(summary.metrics.mttr, 0);
        assert_eq!(summary.metrics.duration_metrics, DurationMetrics::default());
    }

    #[test]
    fn job_summaries_survive_reencoding() {
        let summaries: JobSummaries = serde_json::from_str(
            r#"{"items":[{"name":"lint","metrics":{"success_rate":0.5,"throughput":2.5,"total_runs":4,"failed_runs":2,"successful_runs":2,"total_credits_used":30,"duration_metrics":{"min":1,"max":9,"median":4,"mean":5,"p95":8,"standard_deviation":1.5}},"window_start":"s","window_end":"e"}],"next_page_token":"next"}"#,
        )
        .unwrap();

        let encoded = serde_json::to_string(&summaries).unwrap();
        let decoded: JobSummaries = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, summaries);
        assert_eq!(decoded.next_page_token.as_deref(), Some("next"));
        assert_eq!(decoded.items[0].metrics.duration_metrics.p95, 8);
    }

    #[test]
    fn workflow_run_ignores_unknown_fields() {
        let run: WorkflowRun = serde_json::from_str(
            r#"{"id":"a","status":"success","duration":5,"created_at":"c","stopped_at":"s","credits_used":7,"is_approval":false}"#,
        )
        .unwrap();

        assert_eq!(run.id, "a");
        assert_eq!(run.duration, 5);
        assert_eq!(run.credits_used, 7);
    }

    #[test]
    fn summary_defaults_missing_metrics() {
        let summary: WorkflowSummary =
            serde_json::from_str(r#"{"name":"deploy","metrics":{"success_rate":0.5}}"#).unwrap();

        assert_eq!(summary.name, "deploy");
        assert_eq!(summary.metrics.success_rate, 0.5);
        assert_eq!(summary.metrics.duration_metrics, DurationMetrics::default());
        assert!(summary.window_start.is_empty());
    }

    #[test]
    fn null_page_token_decodes_as_none() {
        let runs: WorkflowRuns =
            serde_json::from_str(r#"{"next_page_token":null,"items":[]}"#).unwrap();
        assert_eq!(runs, WorkflowRuns::default());
    }

    #[tokio::test]
    async fn empty_workflow_name_is_rejected() {
        let client = Client::new("xxx").with_endpoint("http://127.0.0.1:9");
        let err = client
            .workflow_runs(&Context::background(), "gh/org/repo", "", Some("main"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingParameter("workflow name")));
    }

    #[tokio::test]
    async fn empty_job_name_is_rejected() {
        let client = Client::new("xxx").with_endpoint("http://127.0.0.1:9");
        let err = client
            .job_runs_raw(&Context::background(), "gh/org/repo", "build", "", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingParameter("job name")));
    }
}
