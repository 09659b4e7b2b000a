/*!
 * Monitoring Module
 * Structured logging for the scheduler
 */

pub mod tracer;

pub use tracer::init_tracing;
