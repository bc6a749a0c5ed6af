//! Capability interfaces of the collaborators the harness drives.
//!
//! The execution engine never talks to a concrete orchestration engine or
//! query service. Adapters implement these traits; the harness only sees
//! the capability sets. Calls are synchronous and sequential: an adapter is
//! reused across many test cases but never called concurrently.

use crate::error::Result;
use crate::types::{
    ElementInstance, Incident, ProcessInstanceKey, ProcessInstanceState, Variable,
};

/// State-changing side of an orchestration engine.
///
/// Variables are passed as JSON documents encoded as strings.
pub trait TestEngine {
    /// Called once before the first test case of a spec run
    fn before_all(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called before every test case, before resources are deployed
    fn before_each(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after every test case, including failed ones
    fn after_each(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the last test case of a spec run
    fn after_all(&mut self) -> Result<()> {
        Ok(())
    }

    fn deploy_resource(&mut self, name: &str, content: &[u8]) -> Result<()>;

    fn create_instance(&mut self, process_id: &str, variables: &str) -> Result<ProcessInstanceKey>;

    /// Complete the next available job of the given type
    fn complete_task(&mut self, job_type: &str, variables: &str) -> Result<()>;

    fn publish_message(
        &mut self,
        message_name: &str,
        correlation_key: &str,
        variables: &str,
    ) -> Result<()>;

    /// Throw a business error on the next available job of the given type
    fn throw_error(&mut self, job_type: &str, error_code: &str, error_message: &str)
        -> Result<()>;

    fn cancel_instance(&mut self, key: ProcessInstanceKey) -> Result<()>;

    /// All process instances the engine currently knows, in creation order
    fn list_known_handles(&mut self) -> Result<Vec<ProcessInstanceKey>>;
}

/// Read side: eventually-consistent view of the engine's state.
pub trait ReadModel {
    /// `None` while the instance is not yet visible in the read model
    fn instance_state(&self, key: ProcessInstanceKey) -> Result<Option<ProcessInstanceState>>;

    fn element_instances(&self, key: ProcessInstanceKey) -> Result<Vec<ElementInstance>>;

    fn instance_variables(&self, key: ProcessInstanceKey) -> Result<Vec<Variable>>;

    fn incidents(&self, key: ProcessInstanceKey) -> Result<Vec<Incident>>;
}

impl<T: TestEngine + ?Sized> TestEngine for Box<T> {
    fn before_all(&mut self) -> Result<()> {
        (**self).before_all()
    }

    fn before_each(&mut self) -> Result<()> {
        (**self).before_each()
    }

    fn after_each(&mut self) -> Result<()> {
        (**self).after_each()
    }

    fn after_all(&mut self) -> Result<()> {
        (**self).after_all()
    }

    fn deploy_resource(&mut self, name: &str, content: &[u8]) -> Result<()> {
        (**self).deploy_resource(name, content)
    }

    fn create_instance(&mut self, process_id: &str, variables: &str) -> Result<ProcessInstanceKey> {
        (**self).create_instance(process_id, variables)
    }

    fn complete_task(&mut self, job_type: &str, variables: &str) -> Result<()> {
        (**self).complete_task(job_type, variables)
    }

    fn publish_message(
        &mut self,
        message_name: &str,
        correlation_key: &str,
        variables: &str,
    ) -> Result<()> {
        (**self).publish_message(message_name, correlation_key, variables)
    }

    fn throw_error(
        &mut self,
        job_type: &str,
        error_code: &str,
        error_message: &str,
    ) -> Result<()> {
        (**self).throw_error(job_type, error_code, error_message)
    }

    fn cancel_instance(&mut self, key: ProcessInstanceKey) -> Result<()> {
        (**self).cancel_instance(key)
    }

    fn list_known_handles(&mut self) -> Result<Vec<ProcessInstanceKey>> {
        (**self).list_known_handles()
    }
}

impl<T: ReadModel + ?Sized> ReadModel for Box<T> {
    fn instance_state(&self, key: ProcessInstanceKey) -> Result<Option<ProcessInstanceState>> {
        (**self).instance_state(key)
    }

    fn element_instances(&self, key: ProcessInstanceKey) -> Result<Vec<ElementInstance>> {
        (**self).element_instances(key)
    }

    fn instance_variables(&self, key: ProcessInstanceKey) -> Result<Vec<Variable>> {
        (**self).instance_variables(key)
    }

    fn incidents(&self, key: ProcessInstanceKey) -> Result<Vec<Incident>> {
        (**self).incidents(key)
    }
}
