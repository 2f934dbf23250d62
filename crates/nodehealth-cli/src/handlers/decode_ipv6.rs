use super::emit;
use crate::context::ExecutionContext;
use crate::views::ipv6_table;
use anyhow::Result;
use nodehealth_providers::topology::parse_ipv6;
use serde_json::json;

/// Returns whether any address failed to parse.
pub fn handle(ctx: &ExecutionContext, addresses: &[String]) -> Result<bool> {
    let decoded: Vec<_> = addresses
        .iter()
        .map(|address| (address.clone(), parse_ipv6(address).map_err(|e| e.to_string())))
        .collect();

    let body: Vec<_> = decoded
        .iter()
        .map(|(address, fields)| match fields {
            Ok(fields) => json!({ "address": address, "fields": fields }),
            Err(err) => json!({ "address": address, "error": err }),
        })
        .collect();
    emit(ctx, &ipv6_table(&decoded, ctx.color()), &body, None)?;

    Ok(decoded.iter().any(|(_, fields)| fields.is_err()))
}
