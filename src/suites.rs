//! Hook sets for concrete APIs, built on the public registry API.

pub mod scitran;
