//! Hooks for the scitran data-management API contract.
//!
//! Every request is issued as the admin user with root privileges. Job and
//! gear identifiers are captured from the listing endpoints and threaded into
//! the routes that address a single job or gear. Routes the contract runner
//! cannot exercise (redirects, multipart file fields) are skipped.

use crate::hooks::hook::hook_fn;
use crate::hooks::registry::HookRegistry;
use crate::runtime::error::RegistryError;
use crate::suite::ContractSuite;
use anyhow::{Context, Result};

pub const ADMIN_USER: &str = "admin@user.com";
pub const TEST_USER_ID: &str = "jane.doe@gmail.com";
/// Well-formed job id that does not exist on the server.
pub const MISSING_JOB_ID: &str = "57ace4479e512c61bc6e006f";
pub const DOWNLOAD_TICKET: &str = "1234";

pub const JOB_ID_SLOT: &str = "job_id";
pub const GEAR_NAME_SLOT: &str = "gear_name";

const REDIRECT_REASON: &str = "avatar redirects are not followed by the contract runner";
const FILE_FIELD_REASON: &str = "file fields cannot be exercised by the contract runner yet";

const JOB_ROUTES: [&str; 3] = [
    "GET /jobs/{JobId} -> 200",
    "PUT /jobs/{JobId} -> 200",
    "POST /jobs/{JobId}/retry -> 200",
];

const USER_ROUTES: [&str; 3] = [
    "GET /users/{UserId} -> 200",
    "PUT /users/{UserId} -> 200",
    "DELETE /users/{UserId} -> 200",
];

const GEAR_ROUTES: [&str; 2] = [
    "GET /gears/{GearName} -> 200",
    "POST /gears/{GearName} -> 200",
];

const SKIPPED: [(&str, &str); 7] = [
    ("GET /users/self/avatar -> 307", REDIRECT_REASON),
    ("GET /users/{UserId}/avatar -> 307", REDIRECT_REASON),
    ("POST /download -> 200", FILE_FIELD_REASON),
    ("GET /download -> 200", FILE_FIELD_REASON),
    ("POST /upload/label -> 200", FILE_FIELD_REASON),
    ("POST /upload/uid -> 200", FILE_FIELD_REASON),
    ("POST /engine -> 200", FILE_FIELD_REASON),
];

/// Registers the scitran hook set.
pub fn register(registry: &mut HookRegistry) -> Result<(), RegistryError> {
    registry
        .before_each(hook_fn(|ctx, _state| {
            ctx.request
                .set_query("user", ADMIN_USER)
                .set_query("root", "true");
            Ok(())
        }))
        .named("admin query");

    registry
        .after(
            "GET /jobs -> 200",
            hook_fn(|ctx, state| {
                let id = ctx
                    .response()?
                    .body_pointer("/0/_id")
                    .cloned()
                    .context("job listing returned no job id")?;
                tracing::debug!(job_id = %id, "captured job id");
                state.capture(JOB_ID_SLOT, id);
                Ok(())
            }),
        )?
        .named("capture job id")
        .produces(JOB_ID_SLOT);

    for route in JOB_ROUTES {
        registry
            .before(
                route,
                hook_fn(|ctx, state| {
                    let id = state.resolve_string(JOB_ID_SLOT);
                    ctx.request.set_param("JobId", id);
                    Ok(())
                }),
            )?
            .named("inject job id")
            .requires(JOB_ID_SLOT);
    }

    registry
        .before(
            "GET /jobs/{JobId} -> 404",
            hook_fn(|ctx, _state| {
                ctx.request.set_param("JobId", MISSING_JOB_ID);
                Ok(())
            }),
        )?
        .named("inject missing job id");

    // The ticket is the only query parameter of this route.
    registry
        .before(
            "GET /download -> 404",
            hook_fn(|ctx, _state| {
                ctx.request.query.clear();
                ctx.request.set_query("ticket", DOWNLOAD_TICKET);
                Ok(())
            }),
        )?
        .named("download ticket");

    for route in USER_ROUTES {
        registry
            .before(
                route,
                hook_fn(|ctx, _state| {
                    ctx.request.set_param("UserId", TEST_USER_ID);
                    Ok(())
                }),
            )?
            .named("inject user id");
    }

    registry
        .after(
            "GET /gears -> 200",
            hook_fn(|ctx, state| {
                let name = ctx
                    .response()?
                    .body_pointer("/0/name")
                    .cloned()
                    .context("gear listing returned no gear name")?;
                tracing::debug!(gear_name = %name, "captured gear name");
                state.capture(GEAR_NAME_SLOT, name);
                Ok(())
            }),
        )?
        .named("capture gear name")
        .produces(GEAR_NAME_SLOT);

    for route in GEAR_ROUTES {
        registry
            .before(
                route,
                hook_fn(|ctx, state| {
                    let name = state.resolve_string(GEAR_NAME_SLOT);
                    ctx.request.set_param("GearName", name);
                    Ok(())
                }),
            )?
            .named("inject gear name")
            .requires(GEAR_NAME_SLOT);
    }

    for (route, reason) in SKIPPED {
        registry.skip(route, reason)?;
    }

    Ok(())
}

/// Every case the scitran hooks touch, with each listing ahead of the routes
/// that consume its captured identifier.
pub fn contract_suite() -> Result<ContractSuite> {
    ContractSuite::from_keys([
        "GET /download -> 404",
        "GET /download -> 200",
        "POST /download -> 200",
        "POST /engine -> 200",
        "GET /gears -> 200",
        "GET /gears/{GearName} -> 200",
        "POST /gears/{GearName} -> 200",
        "GET /jobs -> 200",
        "GET /jobs/{JobId} -> 200",
        "GET /jobs/{JobId} -> 404",
        "PUT /jobs/{JobId} -> 200",
        "POST /jobs/{JobId}/retry -> 200",
        "POST /upload/label -> 200",
        "POST /upload/uid -> 200",
        "GET /users/self/avatar -> 307",
        "GET /users/{UserId} -> 200",
        "PUT /users/{UserId} -> 200",
        "DELETE /users/{UserId} -> 200",
        "GET /users/{UserId}/avatar -> 307",
    ])
}
