/**
 * Organizers Module: gateway subaccount onboarding
 *
 * Exports:
 * - handler: HTTP endpoint
 * - service: subaccount creation via the gateway port
 */

pub mod handler;
pub mod service;
