mod global;
mod service;
mod sweeper;
