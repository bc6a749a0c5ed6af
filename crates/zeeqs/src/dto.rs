//! GraphQL response shapes and their conversion into the common records

use serde::Deserialize;

use flowspec_common::{
    ElementInstance, ElementInstanceState, ElementScope, Error, Incident, IncidentState,
    ProcessInstanceKey, ProcessInstanceState, Result, Variable,
};

const OPERATION: &str = "query";

#[derive(Debug, Deserialize)]
pub(crate) struct Response<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InstancesData {
    pub process_instances: Nodes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes {
    pub nodes: Vec<InstanceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InstanceData<T> {
    pub process_instance: Option<T>,
}

/// GraphQL `ID` values arrive as strings, older services send numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum KeyDto {
    Number(i64),
    Text(String),
}

impl KeyDto {
    fn parse(&self) -> Result<ProcessInstanceKey> {
        match self {
            KeyDto::Number(key) => Ok(ProcessInstanceKey(*key)),
            KeyDto::Text(text) => text
                .parse()
                .map(ProcessInstanceKey)
                .map_err(|_| Error::adapter(OPERATION, format!("invalid process instance key '{}'", text))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstanceDto {
    pub key: KeyDto,
    pub state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ElementInstancesDto {
    pub element_instances: Vec<ElementInstanceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ElementInstanceDto {
    pub element_id: String,
    pub element_name: Option<String>,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariablesDto {
    pub variables: Vec<VariableDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariableDto {
    pub name: String,
    pub value: String,
    pub scope: Option<ScopeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScopeDto {
    pub element_id: String,
    pub element_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IncidentsDto {
    pub incidents: Vec<IncidentDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncidentDto {
    pub error_type: String,
    pub error_message: Option<String>,
    pub state: String,
    pub element_instance: Option<ScopeDto>,
}

fn state<S: std::str::FromStr>(value: &str) -> Result<S>
where
    S::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: S::Err| Error::adapter(OPERATION, e))
}

impl From<ScopeDto> for ElementScope {
    fn from(scope: ScopeDto) -> Self {
        ElementScope::new(scope.element_id, scope.element_name)
    }
}

impl InstanceDto {
    pub fn key(&self) -> Result<ProcessInstanceKey> {
        self.key.parse()
    }

    pub fn state(&self) -> Result<ProcessInstanceState> {
        state(&self.state)
    }
}

impl TryFrom<ElementInstanceDto> for ElementInstance {
    type Error = Error;

    fn try_from(dto: ElementInstanceDto) -> Result<Self> {
        Ok(ElementInstance {
            state: state::<ElementInstanceState>(&dto.state)?,
            element_id: dto.element_id,
            element_name: dto.element_name,
        })
    }
}

impl From<VariableDto> for Variable {
    fn from(dto: VariableDto) -> Self {
        Variable {
            name: dto.name,
            value: dto.value,
            scope: dto.scope.map(ElementScope::from),
        }
    }
}

impl TryFrom<IncidentDto> for Incident {
    type Error = Error;

    fn try_from(dto: IncidentDto) -> Result<Self> {
        Ok(Incident {
            state: state::<IncidentState>(&dto.state)?,
            error_type: dto.error_type,
            error_message: dto.error_message,
            element: dto.element_instance.map(ElementScope::from),
        })
    }
}
