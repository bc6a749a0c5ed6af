//! Kinds Command
//!
//! Lists the step discriminators a spec document may use.

use serde::Serialize;

use flowspec_runner::registry::{action_kinds, verification_kinds};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Serialize)]
pub struct KindInfo {
    pub kind: &'static str,
    pub step: &'static str,
}

impl TableDisplay for KindInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Step"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.kind.to_string(), self.step.to_string()]
    }
}

pub fn kinds() -> Vec<KindInfo> {
    action_kinds()
        .map(|kind| KindInfo { kind, step: "action" })
        .chain(verification_kinds().map(|kind| KindInfo {
            kind,
            step: "verification",
        }))
        .collect()
}

pub fn execute(format: OutputFormat) {
    print_list(&kinds(), format);
}
