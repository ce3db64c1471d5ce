use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod commands;
pub mod output;

#[derive(Parser)]
#[command(
    name = "unscramble",
    version,
    about = "Symbol navigation and renaming over decompiled, obfuscated class files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Program snapshot (classes and references) exported by the decompiler
    #[arg(long, global = true, default_value = "snapshot.json")]
    pub snapshot: PathBuf,

    /// Mapping file with the current name bindings
    #[arg(long, global = true)]
    pub mappings: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Path to config file (default: .unscramble/config.toml or unscramble.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List obfuscated and deobfuscated classes
    Classes,

    /// Show the info panel for a symbol (e.g. `a.b.m(I)V`)
    Info {
        entry: String,
    },

    /// Resolve a caret position in a rendered source file
    At {
        /// Rendered source with token annotations (JSON)
        #[arg(long)]
        source: PathBuf,
        /// Character offset into the source text
        position: usize,
    },

    /// Class or method inheritance tree
    Inheritance {
        entry: String,
    },

    /// Implementations of an interface or abstract method
    Implementations {
        entry: String,
    },

    /// Call sites of a field, method or constructor
    Calls {
        entry: String,
    },

    /// Every token in a rendered source that denotes a symbol
    Tokens {
        #[arg(long)]
        source: PathBuf,
        entry: String,
    },

    /// Split a rendered source's tokens into obfuscated and deobfuscated
    Highlights {
        #[arg(long)]
        source: PathBuf,
    },

    /// Rename a symbol and write the mapping file
    Rename {
        entry: String,
        new_name: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Compact,
}
