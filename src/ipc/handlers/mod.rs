pub mod calendar;
pub mod contacts;
pub mod core;
pub mod events;
pub mod kanban;
pub mod projects;
pub mod setup;
