// src/models.rs

//! Closed-choice settings.
//!
//! These enums are what the command line accepts for settings with a fixed set
//! of values. The namespace itself stores their string form (so templates can
//! print them), and code that needs to branch on them parses it back with
//! [`Namespace::get_enum`](crate::core::namespace::Namespace::get_enum).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not a valid {kind}.")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a string-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[value(name = $text)]
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseChoiceError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

choice_enum! {
    /// A named set of presets for settings left unset by the user.
    Environment, "environment" {
        Development => "development",
        Production => "production",
    }
}

choice_enum! {
    /// How the application server is exposed to the outside world.
    DeploymentScheme, "deployment scheme" {
        ModRewrite => "mod_rewrite",
        ModWsgi => "mod_wsgi",
        ModWsgiExpress => "mod_wsgi_express",
        Cherrypy => "cherrypy",
    }
}

impl DeploymentScheme {
    /// Whether Apache runs the application itself (as opposed to proxying to it).
    pub fn is_wsgi(self) -> bool {
        matches!(self, Self::ModWsgi | Self::ModWsgiExpress)
    }
}

choice_enum! {
    /// How the ZODB database server is run.
    ZodbDeploymentScheme, "ZODB deployment scheme" {
        Zeo => "zeo",
        ZeoService => "zeo_service",
    }
}

choice_enum! {
    /// Whether a desktop launcher should be created.
    LauncherMode, "launcher mode" {
        Yes => "yes",
        No => "no",
        Auto => "auto",
    }
}

choice_enum! {
    /// Compression applied to the archive embedded in a bundle.
    Compression, "compression" {
        Gz => "gz",
        Lz4 => "lz4",
        Uncompressed => "none",
    }
}

choice_enum! {
    /// What the `feature` command does to the selected feature.
    FeatureAction, "feature action" {
        Update => "update",
        Enable => "enable",
        Disable => "disable",
    }
}
