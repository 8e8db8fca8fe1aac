//! HTTP implementation of the collaborator interfaces
//!
//! All endpoints live under `{base_url}/api/workflows`. Queue subscriptions
//! are driven by a background poll loop per queue that feeds a bounded
//! channel.

use super::config::ClientConfig;
use super::{JobQueue, Subscription, WorkflowService};
use crate::error::{CoreError, CoreResult};
use crate::workflow::{
    JobMessage, NewEvent, NewRun, PaginatedList, QueueOptions, RunFilter, RunUpdate,
    WorkflowEvent, WorkflowJob, WorkflowRun,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// HTTP client for the workflow service.
#[derive(Clone)]
pub struct HttpWorkflowClient {
    http: reqwest::Client,
    base: Arc<str>,
    poll_interval: Duration,
    subscription_buffer: usize,
    pollers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    event: &'a NewEvent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueRequest<'a> {
    queue_name: &'a str,
    message: &'a JobMessage,
    opts: &'a QueueOptions,
}

impl HttpWorkflowClient {
    /// Build a client from validated configuration.
    pub fn new(config: &ClientConfig) -> CoreResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .default_headers(config.credentials().headers()?)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base: Arc::from(config.workflows_url()),
            poll_interval: config.poll_interval,
            subscription_buffer: config.subscription_buffer,
            pollers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Fetch the next message of a queue, if any.
    pub async fn poll_queue(&self, queue_name: &str) -> CoreResult<Option<WorkflowJob>> {
        let response = self
            .http
            .get(self.url(&format!("/queue/{}", queue_name)))
            .send()
            .await?;
        let body = success_text(response).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_ack(&self, path: &str, job_id: &str) -> CoreResult<()> {
        let response = self
            .http
            .post(self.url(path))
            .json(&json!({ "messageId": job_id }))
            .send()
            .await?;
        success_text(response).await?;
        Ok(())
    }
}

async fn success_text(response: reqwest::Response) -> CoreResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(CoreError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> CoreResult<T> {
    let body = success_text(response).await?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl WorkflowService for HttpWorkflowClient {
    async fn create_run(&self, run: NewRun) -> CoreResult<WorkflowRun> {
        let response = self.http.post(self.url("/runs")).json(&run).send().await?;
        parse_json(response).await
    }

    async fn get_run(&self, run_id: &str) -> CoreResult<WorkflowRun> {
        let response = self
            .http
            .get(self.url(&format!("/runs/{}", run_id)))
            .send()
            .await?;
        parse_json(response).await
    }

    async fn update_run(&self, run_id: &str, update: RunUpdate) -> CoreResult<WorkflowRun> {
        let response = self
            .http
            .patch(self.url(&format!("/runs/{}", run_id)))
            .json(&update)
            .send()
            .await?;
        parse_json(response).await
    }

    async fn cancel_run(&self, run_id: &str, reason: Option<&str>) -> CoreResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/runs/{}", run_id)))
            .json(&json!({ "reason": reason }))
            .send()
            .await?;
        success_text(response).await?;
        Ok(())
    }

    async fn list_runs(&self, filter: &RunFilter) -> CoreResult<PaginatedList<WorkflowRun>> {
        let response = self
            .http
            .get(self.url("/runs"))
            .query(&filter.query_pairs())
            .send()
            .await?;
        parse_json(response).await
    }

    async fn create_event(&self, run_id: &str, event: NewEvent) -> CoreResult<WorkflowEvent> {
        let body = EventRequest {
            run_id,
            event: &event,
        };
        let response = self.http.post(self.url("/events")).json(&body).send().await?;
        parse_json(response).await
    }

    async fn list_events(&self, run_id: &str) -> CoreResult<Vec<WorkflowEvent>> {
        let response = self
            .http
            .get(self.url(&format!("/runs/{}/events", run_id)))
            .send()
            .await?;
        parse_json(response).await
    }
}

#[async_trait]
impl JobQueue for HttpWorkflowClient {
    async fn queue_message(
        &self,
        queue_name: &str,
        message: JobMessage,
        options: QueueOptions,
    ) -> CoreResult<()> {
        let body = QueueRequest {
            queue_name,
            message: &message,
            opts: &options,
        };
        let response = self.http.post(self.url("/queue")).json(&body).send().await?;
        success_text(response).await?;
        Ok(())
    }

    async fn ack(&self, job_id: &str) -> CoreResult<()> {
        self.post_ack("/queue/ack", job_id).await
    }

    async fn nack(&self, job_id: &str) -> CoreResult<()> {
        self.post_ack("/queue/nack", job_id).await
    }

    async fn touch(&self, job_id: &str) -> CoreResult<()> {
        self.post_ack("/queue/touch", job_id).await
    }

    async fn subscribe(&self, queue_name: &str) -> CoreResult<Subscription> {
        let (tx, rx) = mpsc::channel(self.subscription_buffer);

        // The first poll doubles as the subscription handshake.
        if let Some(job) = self.poll_queue(queue_name).await? {
            let _ = tx.send(job).await;
        }

        let client = self.clone();
        let queue = queue_name.to_string();
        let handle = tokio::spawn(async move {
            loop {
                match client.poll_queue(&queue).await {
                    Ok(Some(job)) => {
                        if tx.send(job).await.is_err() {
                            debug!(queue = %queue, "Subscriber dropped, stopping poll loop");
                            break;
                        }
                    }
                    Ok(None) => tokio::time::sleep(client.poll_interval).await,
                    Err(e) => {
                        warn!(queue = %queue, error = %e, "Queue poll failed");
                        tokio::time::sleep(client.poll_interval).await;
                    }
                }
            }
        });

        if let Some(previous) = self.pollers.lock().insert(queue_name.to_string(), handle) {
            previous.abort();
        }
        debug!(queue = %queue_name, "Subscribed");
        Ok(Subscription::new(queue_name, rx))
    }

    async fn unsubscribe(&self, queue_name: &str) -> CoreResult<()> {
        if let Some(handle) = self.pollers.lock().remove(queue_name) {
            handle.abort();
            debug!(queue = %queue_name, "Unsubscribed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpWorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWorkflowClient")
            .field("base", &self.base)
            .field("poll_interval", &self.poll_interval)
            .field("subscriptions", &self.pollers.lock().len())
            .finish()
    }
}
