//! Blocking GraphQL client for ZeeQS

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::trace;

use flowspec_common::{
    ElementInstance, Error, Incident, ProcessInstanceKey, ProcessInstanceState, ReadModel, Result,
    Variable,
};

use crate::dto::{
    ElementInstancesDto, IncidentsDto, InstanceData, InstanceDto, InstancesData, Response,
    VariablesDto,
};

/// ZeeQS connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeeqsConfig {
    /// GraphQL endpoint, `http://` is assumed when no scheme is given
    pub endpoint: String,
    pub request_timeout_ms: u64,
}

impl Default for ZeeqsConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000/graphql".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

impl ZeeqsConfig {
    pub fn url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}

/// Read model backed by a ZeeQS service
pub struct ZeeqsClient {
    client: Client,
    url: String,
}

impl ZeeqsClient {
    pub fn new(config: &ZeeqsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::adapter("connect", e))?;

        Ok(Self {
            client,
            url: config.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Keys of every process instance ZeeQS has seen
    pub fn process_instance_keys(&self) -> Result<Vec<ProcessInstanceKey>> {
        let response: Response<InstancesData> =
            self.query("{ processInstances { nodes { key, state } } }")?;

        response
            .data
            .process_instances
            .nodes
            .iter()
            .map(InstanceDto::key)
            .collect()
    }

    fn query<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        trace!("Send query request to ZeeQS: {}", query);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .map_err(|e| Error::adapter("query", e))?;

        let status = response.status();
        let body = response.text().map_err(|e| Error::adapter("query", e))?;

        trace!(
            "Received query response from ZeeQS: [status-code: {}, body: {}]",
            status,
            body
        );

        if status != StatusCode::OK {
            return Err(Error::adapter(
                "query",
                format!("ZeeQS responded with [status-code: {}, body: {}]", status.as_u16(), body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| Error::adapter("query", e))
    }

    fn instance_query<T: DeserializeOwned>(
        &self,
        key: ProcessInstanceKey,
        selection: &str,
    ) -> Result<Option<T>> {
        let query = format!("{{ processInstance(key: {}) {{ {} }} }}", key, selection);
        let response: Response<InstanceData<T>> = self.query(&query)?;
        Ok(response.data.process_instance)
    }
}

impl ReadModel for ZeeqsClient {
    fn instance_state(&self, key: ProcessInstanceKey) -> Result<Option<ProcessInstanceState>> {
        self.instance_query::<InstanceDto>(key, "key, state")?
            .map(|instance| instance.state())
            .transpose()
    }

    fn element_instances(&self, key: ProcessInstanceKey) -> Result<Vec<ElementInstance>> {
        self.instance_query::<ElementInstancesDto>(
            key,
            "elementInstances { elementId, elementName, state }",
        )?
        .map(|dto| dto.element_instances)
        .unwrap_or_default()
        .into_iter()
        .map(ElementInstance::try_from)
        .collect()
    }

    fn instance_variables(&self, key: ProcessInstanceKey) -> Result<Vec<Variable>> {
        Ok(self
            .instance_query::<VariablesDto>(
                key,
                "variables { name, value, scope { elementId, elementName } }",
            )?
            .map(|dto| dto.variables)
            .unwrap_or_default()
            .into_iter()
            .map(Variable::from)
            .collect())
    }

    fn incidents(&self, key: ProcessInstanceKey) -> Result<Vec<Incident>> {
        self.instance_query::<IncidentsDto>(
            key,
            "incidents { errorType, errorMessage, state, elementInstance { elementId, elementName } }",
        )?
        .map(|dto| dto.incidents)
        .unwrap_or_default()
        .into_iter()
        .map(Incident::try_from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowspec_common::{ElementInstanceState, ElementScope, IncidentState};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use test_case::test_case;

    /// Serve one canned HTTP response and hand back the request body
    fn serve_once(status: &'static str, body: &'static str) -> (ZeeqsClient, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        // callers that ignore the request drop the receiver
                        let _ = tx.send(text[end + 4..].to_string());
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        let client = ZeeqsClient::new(&ZeeqsConfig {
            endpoint: format!("{}/graphql", addr),
            request_timeout_ms: 2000,
        })
        .unwrap();
        (client, rx)
    }

    #[test_case("localhost:9000/graphql", "http://localhost:9000/graphql" ; "scheme added")]
    #[test_case("https://zeeqs.local/graphql", "https://zeeqs.local/graphql" ; "scheme kept")]
    fn test_endpoint_url(endpoint: &str, expected: &str) {
        let config = ZeeqsConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        };
        assert_eq!(config.url(), expected);
    }

    #[test]
    fn test_instance_state() {
        let (client, request) = serve_once(
            "200 OK",
            r#"{"data":{"processInstance":{"key":"2251799813685249","state":"COMPLETED"}}}"#,
        );

        let state = client.instance_state(ProcessInstanceKey(2251799813685249)).unwrap();
        assert_eq!(state, Some(ProcessInstanceState::Completed));

        let body: serde_json::Value = serde_json::from_str(&request.recv().unwrap()).unwrap();
        assert_eq!(
            body["query"],
            "{ processInstance(key: 2251799813685249) { key, state } }"
        );
    }

    #[test]
    fn test_unknown_instance_has_no_state() {
        let (client, _) = serve_once("200 OK", r#"{"data":{"processInstance":null}}"#);
        assert_eq!(client.instance_state(ProcessInstanceKey(1)).unwrap(), None);
    }

    #[test]
    fn test_unknown_instance_has_no_elements() {
        let (client, _) = serve_once("200 OK", r#"{"data":{"processInstance":null}}"#);
        assert!(client.element_instances(ProcessInstanceKey(1)).unwrap().is_empty());
    }

    #[test]
    fn test_element_instances() {
        let (client, _) = serve_once(
            "200 OK",
            r#"{"data":{"processInstance":{"elementInstances":[
                {"elementId":"start","elementName":null,"state":"COMPLETED"},
                {"elementId":"task_a","elementName":"A","state":"ACTIVATED"}
            ]}}}"#,
        );

        let elements = client.element_instances(ProcessInstanceKey(1)).unwrap();
        assert_eq!(
            elements,
            vec![
                ElementInstance {
                    element_id: "start".into(),
                    element_name: None,
                    state: ElementInstanceState::Completed,
                },
                ElementInstance {
                    element_id: "task_a".into(),
                    element_name: Some("A".into()),
                    state: ElementInstanceState::Activated,
                },
            ]
        );
    }

    #[test]
    fn test_variables_keep_json_text() {
        let (client, _) = serve_once(
            "200 OK",
            r#"{"data":{"processInstance":{"variables":[
                {"name":"orderId","value":"\"o-1\"","scope":{"elementId":"demo","elementName":null}}
            ]}}}"#,
        );

        let variables = client.instance_variables(ProcessInstanceKey(1)).unwrap();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].value, "\"o-1\"");
        assert_eq!(variables[0].scope, Some(ElementScope::new("demo", None)));
    }

    #[test]
    fn test_incidents() {
        let (client, _) = serve_once(
            "200 OK",
            r#"{"data":{"processInstance":{"incidents":[
                {"errorType":"UNHANDLED_ERROR_EVENT","errorMessage":"no catch event","state":"CREATED",
                 "elementInstance":{"elementId":"task_a","elementName":"A"}}
            ]}}}"#,
        );

        let incidents = client.incidents(ProcessInstanceKey(1)).unwrap();
        assert_eq!(incidents[0].state, IncidentState::Created);
        assert_eq!(incidents[0].error_message.as_deref(), Some("no catch event"));
        assert_eq!(
            incidents[0].element,
            Some(ElementScope::new("task_a", Some("A".into())))
        );
    }

    #[test]
    fn test_process_instance_keys_accept_string_and_number_ids() {
        let (client, _) = serve_once(
            "200 OK",
            r#"{"data":{"processInstances":{"nodes":[
                {"key":"2251799813685249","state":"ACTIVATED"},
                {"key":2251799813685260,"state":"COMPLETED"}
            ]}}}"#,
        );

        let keys = client.process_instance_keys().unwrap();
        assert_eq!(
            keys,
            vec![ProcessInstanceKey(2251799813685249), ProcessInstanceKey(2251799813685260)]
        );
    }

    #[test]
    fn test_non_ok_status_is_an_adapter_error() {
        let (client, _) = serve_once("500 Internal Server Error", r#"{"errors":[]}"#);

        let err = client.instance_state(ProcessInstanceKey(1)).unwrap_err();
        assert!(matches!(err, Error::AdapterCall { ref operation, .. } if operation == "query"));
        assert!(err.to_string().contains("status-code: 500"));
    }

    #[test]
    fn test_unknown_state_is_an_adapter_error() {
        let (client, _) = serve_once(
            "200 OK",
            r#"{"data":{"processInstance":{"key":"1","state":"SUSPENDED"}}}"#,
        );

        let err = client.instance_state(ProcessInstanceKey(1)).unwrap_err();
        assert!(matches!(err, Error::AdapterCall { .. }));
    }
}
