mod department_admins;
mod departments;
pub mod dto;
mod login;
mod program_managements;
mod programs;
pub mod response;
mod router;
mod theses;
mod users;
pub mod validation;

pub use router::{AppState, create_router};
