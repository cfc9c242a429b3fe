//! String newtypes shared by the registry, discovery and dispatch layers.
//!
//! A tool name and a parameter name are both plain strings on the wire;
//! keeping them as distinct types stops one from being passed where the
//! other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_newtype {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(
    /// Registry key of a tool (e.g. "send_email").
    ///
    /// Case-sensitive. This is the `action` a client sends to
    /// `/execute_tool` and the `function.name` reported by discovery.
    ToolName
);

string_newtype!(
    /// Name of a declared tool parameter (e.g. "recipient").
    ParamName
);
