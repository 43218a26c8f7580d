mod capacity;
mod common;
mod scoring;
