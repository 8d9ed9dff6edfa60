mod ordering;
mod runner;
mod scitran;
mod scratch;
mod timeouts;
