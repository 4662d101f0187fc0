//! Catalog of gadget types the server can launch.
//!
//! The execution engine owns the gadget implementations; this list is what
//! the API advertises and what start requests are validated against.

use serde::Serialize;

/// Description of one launchable gadget type.
#[derive(Debug, Clone, Serialize)]
pub struct GadgetDescriptor {
    #[serde(rename = "type")]
    pub gadget_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

/// All gadget types known to this server.
pub const GADGETS: &[GadgetDescriptor] = &[
    GadgetDescriptor {
        gadget_type: "trace_tcp",
        name: "Trace TCP",
        description: "Trace TCP connect, accept and close events",
        category: "trace",
    },
    GadgetDescriptor {
        gadget_type: "trace_exec",
        name: "Trace Exec",
        description: "Trace process executions",
        category: "trace",
    },
    GadgetDescriptor {
        gadget_type: "trace_open",
        name: "Trace Open",
        description: "Trace file open calls",
        category: "trace",
    },
    GadgetDescriptor {
        gadget_type: "trace_dns",
        name: "Trace DNS",
        description: "Trace DNS queries and responses",
        category: "trace",
    },
];

/// Whether `gadget_type` names a known gadget.
pub fn is_known(gadget_type: &str) -> bool {
    GADGETS.iter().any(|g| g.gadget_type == gadget_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_gadgets_resolve() {
        assert!(is_known("trace_tcp"));
        assert!(is_known("trace_dns"));
        assert!(!is_known("melt_cpu"));
        assert!(!is_known(""));
    }

    #[test]
    fn descriptor_serializes_type_field() {
        let v = serde_json::to_value(&GADGETS[0]).unwrap();
        assert_eq!(v["type"], "trace_tcp");
        assert_eq!(v["category"], "trace");
    }
}
