pub mod action;
pub mod condition;
pub mod heuristic;
pub mod matching;
pub mod observer;
pub mod parser;
pub mod planner;
pub mod symbol;
pub mod world;
