//! Lua scripts for atomic shared-store operations.
//!
//! Both scripts exist because their read-then-write sequences would race
//! across concurrent request handlers (and across gateway replicas) if
//! issued as separate commands. Lua execution is atomic on the store side,
//! which makes each script a single point of truth.

/// Lua script for the rate-window increment.
///
/// Increments the counter and arms the window TTL only when the increment
/// created the key, so the window starts at the first request and is never
/// extended by later ones. A counter that somehow lost its TTL (e.g. manual
/// intervention) is re-armed rather than left immortal.
///
/// Arguments:
/// - KEYS[1]: Counter key (e.g. `ratelimit:{client}:{window}`)
/// - ARGV[1]: Window length in seconds
///
/// Returns:
/// - { count, ttl }: post-increment count and seconds until the window resets
pub const INCR_WITH_WINDOW: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], tonumber(ARGV[1]))
end
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
    redis.call('EXPIRE', KEYS[1], tonumber(ARGV[1]))
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Lua script for compare-and-swap.
///
/// Replaces the value only if the current value matches the expected one.
/// An empty-string ARGV[1] means "key must be absent"; the gateway never
/// stores empty values, so the sentinel cannot alias a real entry.
///
/// Arguments:
/// - KEYS[1]: Value key
/// - ARGV[1]: Expected current value ('' = key must not exist)
/// - ARGV[2]: New value
/// - ARGV[3]: TTL in seconds for the new value
///
/// Returns:
/// - 1: Swap performed
/// - 0: Current value did not match (or key existed when absence expected)
pub const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '' then
    if current == false then
        redis.call('SET', KEYS[1], ARGV[2], 'EX', tonumber(ARGV[3]))
        return 1
    end
    return 0
end
if current == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', tonumber(ARGV[3]))
    return 1
end
return 0
"#;
