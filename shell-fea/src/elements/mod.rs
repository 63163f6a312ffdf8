//! Structural elements module

mod material;
mod node;
mod shell;
mod support;

pub use material::Material;
pub use node::{Dof, Node, NodeId};
pub use shell::{Shell, ShellId};
pub use support::Support;
