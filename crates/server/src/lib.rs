pub mod config;

pub mod db;

pub mod rest;

pub mod openapi;

pub mod error_convert;

pub mod telemetry;

pub mod health;

pub mod auth;

pub mod storage;

// Intake domain modules
pub mod engine;

pub mod repo;
