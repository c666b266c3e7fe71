/**
 * Webhooks Module: gateway event ingestion
 *
 * Exports:
 * - handler: HTTP endpoint (always 2xx)
 * - service: signature check + dispatch to the transaction engine
 */

pub mod handler;
pub mod service;
