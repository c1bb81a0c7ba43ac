//! Declarative network state generation driven by capture policies.
//!
//! A policy combines named *capture expressions* — written in a small DSL
//! that selects and transforms a current-state document — with a desired
//! state template whose `{{ … }}` placeholders point into those captures.
//! [`generate_state`] resolves the captures, substitutes every placeholder
//! and returns the concrete desired state together with a cache of the
//! resolved captures for reuse on later runs.
//!
//! ## Example
//! ```rust
//! use netpolicy::{generate_state, CachedState, PolicySpec, RawState};
//!
//! let policy: PolicySpec = serde_yaml::from_str(r#"
//! capture:
//!   default-gw: routes.running.destination=="0.0.0.0/0"
//! desiredState:
//!   routes:
//!     config: "{{ capture.default-gw.routes.running }}"
//! "#).unwrap();
//!
//! let current_state = r#"
//! routes:
//!   running:
//!   - destination: 0.0.0.0/0
//!     next-hop-address: 192.168.100.1
//!     next-hop-interface: eth1
//!     table-id: 254
//!   - destination: 1.1.1.0/24
//!     next-hop-address: 192.168.100.1
//!     next-hop-interface: eth1
//!     table-id: 254
//! "#;
//!
//! let generated = generate_state(&policy, current_state.as_bytes(), &CachedState::default()).unwrap();
//! assert!(generated.cache.captured_states.contains_key("default-gw"));
//! ```

mod ast;
mod capture;
mod error;
mod expander;
mod lexer;
mod parser;
mod resolver;
mod state;
mod types;

use chrono::Utc;

use crate::capture::Capture;
use crate::expander::StateExpander;

pub use crate::ast::{Node, NodeKind};
pub use crate::error::Error;
pub use crate::expander::CapturePathResolver;
pub use crate::lexer::{Lexer, Token, TokenKind};
pub use crate::parser::Parser;
pub use crate::resolver::{Resolution, Resolver};
pub use crate::state::RawState;
pub use crate::types::{CachedState, CapturedState, GeneratedState, MetaInfo, PolicySpec};

/// Generate a network state based on the given input data:
/// - a policy spec,
/// - a current state document,
/// - cached (already resolved) named captures.
///
/// The result includes the desired state built by the policy, the superset
/// of the input cache with newly resolved captures added, and meta info
/// about the run. Cached entries keep their timestamps; entries without one
/// are stamped with the run's UTC time.
///
/// On failure a single decorated [`Error`] is returned.
pub fn generate_state(
    policy: &PolicySpec,
    current_state: &[u8],
    cache: &CachedState,
) -> Result<GeneratedState, Error> {
    let capture = Capture::new();
    let result = capture
        .resolve(
            &policy.capture,
            &cache.captured_states,
            &RawState::from(current_state),
        )
        .map_err(|err| err.wrap("failed to generate state, err"))?;

    let timestamp = Utc::now();
    let desired_state = if policy.desired_state.is_empty() {
        RawState::default()
    } else {
        StateExpander::new(&result)
            .expand(&policy.desired_state)
            .map_err(|err| err.wrap("failed to generate state, err"))?
    };

    let mut captured_states = result.captured_states().clone();
    for state in captured_states.values_mut() {
        if state.meta.timestamp.is_none() {
            state.meta.timestamp = Some(timestamp);
            if state.meta.version.is_empty() {
                state.meta.version = "0".to_string();
            }
        }
    }

    Ok(GeneratedState {
        desired_state,
        cache: CachedState { captured_states },
        meta: MetaInfo {
            version: "0".to_string(),
            timestamp: Some(timestamp),
        },
    })
}
