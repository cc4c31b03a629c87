//! Kanban to-do board over a headless content store.
//!
//! Tasks live in the content store; the board keeps a local mirror, renders
//! it in three columns and sends every change back over REST.

pub mod app;
pub mod commands;
pub mod config;
pub mod drag;
pub mod error;
pub mod input;
pub mod kanban_board;
pub mod logging;
pub mod proxy;
pub mod store;
pub mod task;
pub mod ui;

pub use error::StoreError;
pub use kanban_board::KanbanBoard;
pub use store::{CmsClient, MemoryStore, TaskStore};
pub use task::{NewTask, Status, Task, TaskPatch};
