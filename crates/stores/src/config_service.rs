use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use shipyard_core::{ConfigurationStore, Project, Resource, StoreResult};
use std::time::Duration;

use crate::error::{ClientError, Result};

const API_PREFIX: &str = "v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStageRequest<'a> {
    stage_name: &'a str,
}

#[derive(Serialize)]
struct ResourcesRequest<'a> {
    resources: &'a [Resource],
}

/// HTTP client for the git-backed configuration service.
#[derive(Clone)]
pub struct ConfigurationServiceClient {
    base_url: String,
    client: Client,
}

impl ConfigurationServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    fn project_url(&self, project_name: &str) -> String {
        format!(
            "{}/{}/project/{}",
            self.base_url,
            API_PREFIX,
            urlencoding::encode(project_name)
        )
    }

    pub async fn fetch_project(&self, project_name: &str) -> Result<Option<Project>> {
        let response = self.client.get(self.project_url(project_name)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let project = Self::handle_response(response, project_name).await?.json().await?;
        Ok(Some(project))
    }

    pub async fn post_project(&self, project: &Project) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{}/project", self.base_url, API_PREFIX))
            .json(project)
            .send()
            .await?;

        Self::handle_response(response, &project.project_name).await?;
        Ok(())
    }

    pub async fn put_project(&self, project: &Project) -> Result<()> {
        let response = self
            .client
            .put(self.project_url(&project.project_name))
            .json(project)
            .send()
            .await?;

        Self::handle_response(response, &project.project_name).await?;
        Ok(())
    }

    pub async fn remove_project(&self, project_name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.project_url(project_name))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(project = %project_name, "Project already absent from configuration service");
            return Ok(());
        }
        Self::handle_response(response, project_name).await?;
        Ok(())
    }

    pub async fn post_stage(&self, project_name: &str, stage_name: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/stage", self.project_url(project_name)))
            .json(&CreateStageRequest { stage_name })
            .send()
            .await?;

        Self::handle_response(response, stage_name).await?;
        Ok(())
    }

    pub async fn post_resources(&self, project_name: &str, resources: &[Resource]) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/resource", self.project_url(project_name)))
            .json(&ResourcesRequest { resources })
            .send()
            .await?;

        Self::handle_response(response, project_name).await?;
        Ok(())
    }

    pub async fn fetch_resource(
        &self,
        project_name: &str,
        resource_uri: &str,
    ) -> Result<Option<Resource>> {
        let response = self
            .client
            .get(format!(
                "{}/resource/{}",
                self.project_url(project_name),
                urlencoding::encode(resource_uri)
            ))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resource = Self::handle_response(response, resource_uri).await?.json().await?;
        Ok(Some(resource))
    }

    async fn handle_response(response: Response, subject: &str) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::CONFLICT {
            return Err(ClientError::Conflict(subject.to_string()));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(subject.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::InvalidResponse(format!(
            "Status {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl ConfigurationStore for ConfigurationServiceClient {
    async fn get_project(&self, project_name: &str) -> StoreResult<Option<Project>> {
        Ok(self.fetch_project(project_name).await?)
    }

    async fn create_project(&self, project: &Project) -> StoreResult<()> {
        Ok(self.post_project(project).await?)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<()> {
        Ok(self.put_project(project).await?)
    }

    async fn delete_project(&self, project_name: &str) -> StoreResult<()> {
        Ok(self.remove_project(project_name).await?)
    }

    async fn create_stage(&self, project_name: &str, stage_name: &str) -> StoreResult<()> {
        Ok(self.post_stage(project_name, stage_name).await?)
    }

    async fn create_project_shipyard(
        &self,
        project_name: &str,
        resources: &[Resource],
    ) -> StoreResult<()> {
        Ok(self.post_resources(project_name, resources).await?)
    }

    async fn get_project_resource(
        &self,
        project_name: &str,
        resource_uri: &str,
    ) -> StoreResult<Option<Resource>> {
        Ok(self.fetch_resource(project_name, resource_uri).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shipyard_core::StoreError;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ConfigurationServiceClient::new("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(
            client.project_url("my-project"),
            "http://localhost:8080/v1/project/my-project"
        );
    }

    #[tokio::test]
    async fn test_get_project_found_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/project/my-project"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projectName": "my-project",
                "gitRemoteURI": "http://remote",
                "gitUser": "me",
                "creationDate": "123",
                "shipyardVersion": "spec.keptn.sh/0.2.0",
                "stages": [{"stageName": "dev"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/project/unknown"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());

        let project = client.get_project("my-project").await.unwrap().unwrap();
        assert_eq!(project.git_remote_uri, "http://remote");
        assert_eq!(project.stages[0].stage_name, "dev");
        assert!(project.git_token_ref.is_empty());

        assert!(client.get_project("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_project_conflict_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/project"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());
        let err = client
            .create_project(&Project::new("p", "http://remote", "me"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_stage_and_shipyard_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/project/p/stage"))
            .and(body_json(json!({"stageName": "dev"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/project/p/resource"))
            .and(body_json(json!({
                "resources": [{"resourceURI": "shipyard.yaml", "resourceContent": "c2hpcHlhcmQ="}]
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());
        client.create_stage("p", "dev").await.unwrap();
        client
            .create_project_shipyard("p", &[Resource::shipyard("c2hpcHlhcmQ=")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_project_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/project/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());
        client.delete_project("gone").await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/project/p"))
            .respond_with(ResponseTemplate::new(500).set_body_string("git push failed"))
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());
        let err = client
            .update_project(&Project::new("p", "http://remote", "me"))
            .await
            .unwrap_err();

        match err {
            StoreError::InvalidResponse(msg) => assert!(msg.contains("git push failed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_project_resource_encodes_uri() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/project/p/resource/shipyard.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceURI": "shipyard.yaml",
                "resourceContent": "abc"
            })))
            .mount(&server)
            .await;

        let client = ConfigurationServiceClient::new(server.uri());
        let resource = client
            .get_project_resource("p", "shipyard.yaml")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resource.resource_content, "abc");
        assert!(client
            .get_project_resource("p", "missing.yaml")
            .await
            .unwrap()
            .is_none());
    }
}
