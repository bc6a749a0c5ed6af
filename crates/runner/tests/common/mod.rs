//! In-memory engine and read model shared by the runner integration tests.
//!
//! Processes are straight sequences of service tasks:
//! `process -> start -> flow -> task... -> flow -> end`. Completing the job of
//! the active task moves the token on; completing the last one completes the
//! instance.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use flowspec_common::{
    ElementInstance, ElementInstanceState, ElementScope, Error, Incident, IncidentState,
    ProcessInstanceKey, ProcessInstanceState, ReadModel, Result, TestEngine, Variable,
};

const FIRST_KEY: i64 = 2251799813685249;

#[derive(Debug, Clone)]
pub struct Task {
    pub element_id: String,
    pub element_name: String,
    pub job_type: String,
}

#[derive(Debug, Clone)]
struct Instance {
    key: ProcessInstanceKey,
    process_id: String,
    state: ProcessInstanceState,
    elements: Vec<ElementInstance>,
    variables: Vec<Variable>,
    incidents: Vec<Incident>,
    /// Index of the active task
    position: Option<usize>,
}

#[derive(Default)]
pub struct World {
    models: HashMap<String, Vec<Task>>,
    message_starts: HashMap<String, String>,
    instances: Vec<Instance>,
    next_key: i64,
    /// Every engine call, in order
    pub calls: Vec<String>,
    /// Engine operation that fails when called
    pub fail_on: Option<String>,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_key: FIRST_KEY,
            ..Default::default()
        }
    }

    /// Register a process made of tasks `(element_id, element_name, job_type)`
    pub fn model(&mut self, process_id: &str, tasks: &[(&str, &str, &str)]) {
        let tasks = tasks
            .iter()
            .map(|(id, name, job)| Task {
                element_id: id.to_string(),
                element_name: name.to_string(),
                job_type: job.to_string(),
            })
            .collect();
        self.models.insert(process_id.to_string(), tasks);
    }

    /// Publishing `message_name` starts a new instance of `process_id`
    pub fn message_start(&mut self, message_name: &str, process_id: &str) {
        self.message_starts
            .insert(message_name.to_string(), process_id.to_string());
    }

    fn check(&mut self, operation: &str, call: String) -> Result<()> {
        self.calls.push(call);
        if self.fail_on.as_deref() == Some(operation) {
            return Err(Error::adapter(operation, "engine unavailable"));
        }
        Ok(())
    }

    fn start(&mut self, process_id: &str, variables: &str) -> Result<ProcessInstanceKey> {
        let tasks = self
            .models
            .get(process_id)
            .cloned()
            .ok_or_else(|| Error::adapter("create_instance", format!("no process '{}'", process_id)))?;

        let key = ProcessInstanceKey(self.next_key);
        self.next_key += 1;

        let mut instance = Instance {
            key,
            process_id: process_id.to_string(),
            state: ProcessInstanceState::Activated,
            elements: vec![
                element(process_id, None, ElementInstanceState::Activated),
                element("start", Some("Start"), ElementInstanceState::Completed),
            ],
            variables: Vec::new(),
            incidents: Vec::new(),
            position: None,
        };
        merge_variables(&mut instance, variables);
        advance(&mut instance, &tasks, 0);
        self.instances.push(instance);
        Ok(key)
    }

    fn active_instance_for_job(&self, job_type: &str) -> Option<(usize, usize)> {
        for (index, instance) in self.instances.iter().enumerate() {
            if instance.state != ProcessInstanceState::Activated {
                continue;
            }
            if let Some(position) = instance.position {
                let task = &self.models[&instance.process_id][position];
                if task.job_type == job_type && instance.incidents.is_empty() {
                    return Some((index, position));
                }
            }
        }
        None
    }

    fn instance(&self, key: ProcessInstanceKey) -> Option<&Instance> {
        self.instances.iter().find(|i| i.key == key)
    }
}

fn element(id: &str, name: Option<&str>, state: ElementInstanceState) -> ElementInstance {
    ElementInstance {
        element_id: id.to_string(),
        element_name: name.map(str::to_string),
        state,
    }
}

/// Take the flow into task `position`, or into the end event past the last task
fn advance(instance: &mut Instance, tasks: &[Task], position: usize) {
    instance.elements.push(element(
        &format!("flow_{}", position),
        None,
        ElementInstanceState::Taken,
    ));

    match tasks.get(position) {
        Some(task) => {
            instance.elements.push(element(
                &task.element_id,
                Some(&task.element_name),
                ElementInstanceState::Activated,
            ));
            instance.position = Some(position);
        }
        None => {
            instance
                .elements
                .push(element("end", Some("End"), ElementInstanceState::Completed));
            let process_id = instance.process_id.clone();
            if let Some(process) = instance.elements.iter_mut().find(|e| e.element_id == process_id) {
                process.state = ElementInstanceState::Completed;
            }
            instance.state = ProcessInstanceState::Completed;
            instance.position = None;
        }
    }
}

fn merge_variables(instance: &mut Instance, variables: &str) {
    let parsed: serde_json::Value = serde_json::from_str(variables).unwrap_or_default();
    if let serde_json::Value::Object(map) = parsed {
        for (name, value) in map {
            instance.variables.retain(|v| v.name != name);
            instance.variables.push(Variable {
                name,
                value: value.to_string(),
                scope: Some(ElementScope::new(instance.process_id.clone(), None)),
            });
        }
    }
}

pub struct FakeEngine {
    pub world: Rc<RefCell<World>>,
}

impl TestEngine for FakeEngine {
    fn before_all(&mut self) -> Result<()> {
        self.world.borrow_mut().check("before_all", "before_all".into())
    }

    fn before_each(&mut self) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.instances.clear();
        world.check("before_each", "before_each".into())
    }

    fn after_each(&mut self) -> Result<()> {
        self.world.borrow_mut().check("after_each", "after_each".into())
    }

    fn after_all(&mut self) -> Result<()> {
        self.world.borrow_mut().check("after_all", "after_all".into())
    }

    fn deploy_resource(&mut self, name: &str, _content: &[u8]) -> Result<()> {
        self.world
            .borrow_mut()
            .check("deploy_resource", format!("deploy {}", name))
    }

    fn create_instance(&mut self, process_id: &str, variables: &str) -> Result<ProcessInstanceKey> {
        let mut world = self.world.borrow_mut();
        world.check("create_instance", format!("create {}", process_id))?;
        world.start(process_id, variables)
    }

    fn complete_task(&mut self, job_type: &str, variables: &str) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check("complete_task", format!("complete {}", job_type))?;

        let Some((index, position)) = world.active_instance_for_job(job_type) else {
            return Ok(());
        };
        let tasks = world.models[&world.instances[index].process_id].clone();
        let instance = &mut world.instances[index];
        if let Some(task) = instance
            .elements
            .iter_mut()
            .rev()
            .find(|e| e.element_id == tasks[position].element_id)
        {
            task.state = ElementInstanceState::Completed;
        }
        merge_variables(instance, variables);
        advance(instance, &tasks, position + 1);
        Ok(())
    }

    fn publish_message(
        &mut self,
        message_name: &str,
        correlation_key: &str,
        variables: &str,
    ) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check(
            "publish_message",
            format!("publish {} {}", message_name, correlation_key),
        )?;
        if let Some(process_id) = world.message_starts.get(message_name).cloned() {
            world.start(&process_id, variables)?;
        }
        Ok(())
    }

    fn throw_error(&mut self, job_type: &str, error_code: &str, error_message: &str) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check("throw_error", format!("throw {} {}", job_type, error_code))?;

        let Some((index, position)) = world.active_instance_for_job(job_type) else {
            return Ok(());
        };
        let task = world.models[&world.instances[index].process_id][position].clone();
        world.instances[index].incidents.push(Incident {
            error_type: "UNHANDLED_ERROR_EVENT".to_string(),
            error_message: Some(format!("{}: {}", error_code, error_message)),
            state: IncidentState::Created,
            element: Some(ElementScope::new(task.element_id, Some(task.element_name))),
        });
        Ok(())
    }

    fn cancel_instance(&mut self, key: ProcessInstanceKey) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check("cancel_instance", format!("cancel {}", key))?;
        if let Some(instance) = world.instances.iter_mut().find(|i| i.key == key) {
            instance.state = ProcessInstanceState::Terminated;
            for element in instance.elements.iter_mut() {
                if element.state == ElementInstanceState::Activated {
                    element.state = ElementInstanceState::Terminated;
                }
            }
        }
        Ok(())
    }

    fn list_known_handles(&mut self) -> Result<Vec<ProcessInstanceKey>> {
        let mut world = self.world.borrow_mut();
        world.check("list_known_handles", "list".into())?;
        Ok(world.instances.iter().map(|i| i.key).collect())
    }
}

/// Read side over the same world. Lags behind by `lag` reads: the first
/// `lag` calls see nothing.
pub struct FakeReadModel {
    pub world: Rc<RefCell<World>>,
    pub lag: Cell<usize>,
    pub state_reads: Cell<usize>,
    pub element_reads: Cell<usize>,
    pub variable_reads: Cell<usize>,
    pub incident_reads: Cell<usize>,
    pub fail: Cell<bool>,
}

impl FakeReadModel {
    fn visible(&self, counter: &Cell<usize>) -> Result<bool> {
        counter.set(counter.get() + 1);
        if self.fail.get() {
            return Err(Error::adapter("query", "read model unavailable"));
        }
        let lag = self.lag.get();
        if lag > 0 {
            self.lag.set(lag - 1);
            return Ok(false);
        }
        Ok(true)
    }
}

impl ReadModel for FakeReadModel {
    fn instance_state(&self, key: ProcessInstanceKey) -> Result<Option<ProcessInstanceState>> {
        if !self.visible(&self.state_reads)? {
            return Ok(None);
        }
        Ok(self.world.borrow().instance(key).map(|i| i.state))
    }

    fn element_instances(&self, key: ProcessInstanceKey) -> Result<Vec<ElementInstance>> {
        if !self.visible(&self.element_reads)? {
            return Ok(Vec::new());
        }
        Ok(self
            .world
            .borrow()
            .instance(key)
            .map(|i| i.elements.clone())
            .unwrap_or_default())
    }

    fn instance_variables(&self, key: ProcessInstanceKey) -> Result<Vec<Variable>> {
        if !self.visible(&self.variable_reads)? {
            return Ok(Vec::new());
        }
        Ok(self
            .world
            .borrow()
            .instance(key)
            .map(|i| i.variables.clone())
            .unwrap_or_default())
    }

    fn incidents(&self, key: ProcessInstanceKey) -> Result<Vec<Incident>> {
        if !self.visible(&self.incident_reads)? {
            return Ok(Vec::new());
        }
        Ok(self
            .world
            .borrow()
            .instance(key)
            .map(|i| i.incidents.clone())
            .unwrap_or_default())
    }
}

/// Engine and read model over one fresh world with the demo processes:
/// `demo` (tasks a, b, c) and `demo-message` (task a, started by message `start`)
pub fn fixture() -> (FakeEngine, FakeReadModel, Rc<RefCell<World>>) {
    let mut world = World::new();
    world.model("demo", &[("task_a", "A", "a"), ("task_b", "B", "b"), ("task_c", "C", "c")]);
    world.model("demo-message", &[("task_a", "A", "a")]);
    world.message_start("start", "demo-message");

    let world = Rc::new(RefCell::new(world));
    let engine = FakeEngine {
        world: world.clone(),
    };
    let read_model = FakeReadModel {
        world: world.clone(),
        lag: Cell::new(0),
        state_reads: Cell::new(0),
        element_reads: Cell::new(0),
        variable_reads: Cell::new(0),
        incident_reads: Cell::new(0),
        fail: Cell::new(false),
    };
    (engine, read_model, world)
}
