//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! Every route lives under `/api`:
//!
//! - **Authentication** (`/api/login`, `/api/password/reset`, `/api/me`)
//! - **Companies** (`/api/companies/*`): superadmin only
//! - **Managers** (`/api/managers/*`)
//! - **Employees** (`/api/employees/*`)
//!
//! API documentation is served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
