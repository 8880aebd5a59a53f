//! # Command Builders
//!
//! Purpose: Turn typed call arguments into `Command` values. Builders do no
//! I/O, so the same command can be sent directly or queued in a transaction.
//!
//! Builders that pair keys with values validate the pairing locally and
//! return `InvalidArguments` before anything reaches the network.

use crate::error::{ClientError, ClientResult};
use crate::reply::{Arg, Command};

/// Existence condition for `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetExist {
    /// Only set the key if it does not already exist.
    Nx,
    /// Only set the key if it already exists.
    Xx,
}

/// Optional flags for `SET`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expire time in seconds.
    pub ex: Option<u64>,
    /// Expire time in milliseconds.
    pub px: Option<u64>,
    pub exist: Option<SetExist>,
}

/// Where `LINSERT` places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    Before,
    After,
}

/// `MATCH` / `COUNT` arguments of the scan family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub pattern: Option<String>,
    pub count: Option<u64>,
}

impl ScanOptions {
    pub(crate) fn apply(&self, mut cmd: Command) -> Command {
        if let Some(pattern) = &self.pattern {
            cmd = cmd.arg("match").arg(pattern);
        }
        if let Some(count) = self.count {
            cmd = cmd.arg("count").arg(count);
        }
        cmd
    }
}

fn key_cmd(name: &str, key: impl Into<Arg>) -> Command {
    Command::new(name).arg(key)
}

fn pairs(name: &str, prefix: Option<Arg>, items: Vec<Arg>) -> ClientResult<Command> {
    if items.is_empty() || items.len() % 2 != 0 {
        return Err(ClientError::InvalidArguments(format!(
            "{} expects key/value pairs, got {} arguments",
            name,
            items.len()
        )));
    }
    let mut cmd = Command::new(name);
    if let Some(prefix) = prefix {
        cmd.push(prefix);
    }
    Ok(cmd.args(items))
}

fn collect<I, A>(items: I) -> Vec<Arg>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    items.into_iter().map(Into::into).collect()
}

// strings

pub fn get(key: impl Into<Arg>) -> Command {
    key_cmd("get", key)
}

pub fn set(key: impl Into<Arg>, value: impl Into<Arg>, options: &SetOptions) -> Command {
    let mut cmd = Command::new("set").arg(key).arg(value);
    if let Some(seconds) = options.ex {
        cmd = cmd.arg("ex").arg(seconds);
    }
    if let Some(millis) = options.px {
        cmd = cmd.arg("px").arg(millis);
    }
    match options.exist {
        Some(SetExist::Nx) => cmd.arg("nx"),
        Some(SetExist::Xx) => cmd.arg("xx"),
        None => cmd,
    }
}

pub fn append(key: impl Into<Arg>, value: impl Into<Arg>) -> Command {
    key_cmd("append", key).arg(value)
}

pub fn strlen(key: impl Into<Arg>) -> Command {
    key_cmd("strlen", key)
}

pub fn incr(key: impl Into<Arg>) -> Command {
    key_cmd("incr", key)
}

pub fn incrby(key: impl Into<Arg>, increment: i64) -> Command {
    key_cmd("incrby", key).arg(increment)
}

pub fn incrbyfloat(key: impl Into<Arg>, increment: f64) -> Command {
    key_cmd("incrbyfloat", key).arg(increment)
}

pub fn decr(key: impl Into<Arg>) -> Command {
    key_cmd("decr", key)
}

pub fn decrby(key: impl Into<Arg>, decrement: i64) -> Command {
    key_cmd("decrby", key).arg(decrement)
}

pub fn getset(key: impl Into<Arg>, value: impl Into<Arg>) -> Command {
    key_cmd("getset", key).arg(value)
}

pub fn setnx(key: impl Into<Arg>, value: impl Into<Arg>) -> Command {
    key_cmd("setnx", key).arg(value)
}

pub fn setex(key: impl Into<Arg>, seconds: u64, value: impl Into<Arg>) -> Command {
    key_cmd("setex", key).arg(seconds).arg(value)
}

pub fn psetex(key: impl Into<Arg>, millis: u64, value: impl Into<Arg>) -> Command {
    key_cmd("psetex", key).arg(millis).arg(value)
}

pub fn getrange(key: impl Into<Arg>, start: i64, end: i64) -> Command {
    key_cmd("getrange", key).arg(start).arg(end)
}

pub fn setrange(key: impl Into<Arg>, offset: u64, value: impl Into<Arg>) -> Command {
    key_cmd("setrange", key).arg(offset).arg(value)
}

pub fn mget<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("mget").args(keys)
}

/// `MSET k1 v1 k2 v2 ...`; `kvs` is a flat key/value list.
pub fn mset<I, A>(kvs: I) -> ClientResult<Command>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    pairs("mset", None, collect(kvs))
}

pub fn msetnx<I, A>(kvs: I) -> ClientResult<Command>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    pairs("msetnx", None, collect(kvs))
}

pub fn getbit(key: impl Into<Arg>, offset: u64) -> Command {
    key_cmd("getbit", key).arg(offset)
}

pub fn setbit(key: impl Into<Arg>, offset: u64, bit: bool) -> Command {
    key_cmd("setbit", key).arg(offset).arg(bit as i64)
}

pub fn bitcount(key: impl Into<Arg>, range: Option<(i64, i64)>) -> Command {
    let cmd = key_cmd("bitcount", key);
    match range {
        Some((start, end)) => cmd.arg(start).arg(end),
        None => cmd,
    }
}

// keys

pub fn del<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("del").args(keys)
}

pub fn exists<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("exists").args(keys)
}

pub fn unlink<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("unlink").args(keys)
}

pub fn expire(key: impl Into<Arg>, seconds: u64) -> Command {
    key_cmd("expire", key).arg(seconds)
}

pub fn pexpire(key: impl Into<Arg>, millis: u64) -> Command {
    key_cmd("pexpire", key).arg(millis)
}

pub fn expireat(key: impl Into<Arg>, timestamp: u64) -> Command {
    key_cmd("expireat", key).arg(timestamp)
}

pub fn ttl(key: impl Into<Arg>) -> Command {
    key_cmd("ttl", key)
}

pub fn pttl(key: impl Into<Arg>) -> Command {
    key_cmd("pttl", key)
}

pub fn persist(key: impl Into<Arg>) -> Command {
    key_cmd("persist", key)
}

pub fn rename(src: impl Into<Arg>, dst: impl Into<Arg>) -> Command {
    key_cmd("rename", src).arg(dst)
}

pub fn renamenx(src: impl Into<Arg>, dst: impl Into<Arg>) -> Command {
    key_cmd("renamenx", src).arg(dst)
}

pub fn keys(pattern: impl Into<Arg>) -> Command {
    Command::new("keys").arg(pattern)
}

pub fn randomkey() -> Command {
    Command::new("randomkey")
}

pub fn scan(cursor: u64, options: &ScanOptions) -> Command {
    options.apply(Command::new("scan").arg(cursor))
}

// hashes

pub fn hset(key: impl Into<Arg>, field: impl Into<Arg>, value: impl Into<Arg>) -> Command {
    key_cmd("hset", key).arg(field).arg(value)
}

pub fn hget(key: impl Into<Arg>, field: impl Into<Arg>) -> Command {
    key_cmd("hget", key).arg(field)
}

pub fn hdel<I, A>(key: impl Into<Arg>, fields: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("hdel", key).args(fields)
}

pub fn hexists(key: impl Into<Arg>, field: impl Into<Arg>) -> Command {
    key_cmd("hexists", key).arg(field)
}

pub fn hgetall(key: impl Into<Arg>) -> Command {
    key_cmd("hgetall", key)
}

pub fn hkeys(key: impl Into<Arg>) -> Command {
    key_cmd("hkeys", key)
}

pub fn hvals(key: impl Into<Arg>) -> Command {
    key_cmd("hvals", key)
}

pub fn hlen(key: impl Into<Arg>) -> Command {
    key_cmd("hlen", key)
}

pub fn hincrby(key: impl Into<Arg>, field: impl Into<Arg>, increment: i64) -> Command {
    key_cmd("hincrby", key).arg(field).arg(increment)
}

pub fn hincrbyfloat(key: impl Into<Arg>, field: impl Into<Arg>, increment: f64) -> Command {
    key_cmd("hincrbyfloat", key).arg(field).arg(increment)
}

pub fn hmget<I, A>(key: impl Into<Arg>, fields: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("hmget", key).args(fields)
}

/// `HMSET key f1 v1 f2 v2 ...`; `field_values` is a flat field/value list.
pub fn hmset<I, A>(key: impl Into<Arg>, field_values: I) -> ClientResult<Command>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    pairs("hmset", Some(key.into()), collect(field_values))
}

pub fn hsetnx(key: impl Into<Arg>, field: impl Into<Arg>, value: impl Into<Arg>) -> Command {
    key_cmd("hsetnx", key).arg(field).arg(value)
}

pub fn hstrlen(key: impl Into<Arg>, field: impl Into<Arg>) -> Command {
    key_cmd("hstrlen", key).arg(field)
}

pub fn hscan(key: impl Into<Arg>, cursor: u64, options: &ScanOptions) -> Command {
    options.apply(key_cmd("hscan", key).arg(cursor))
}

// lists

pub fn lpush<I, A>(key: impl Into<Arg>, values: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("lpush", key).args(values)
}

pub fn rpush<I, A>(key: impl Into<Arg>, values: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("rpush", key).args(values)
}

/// `LPUSHX`: pushes only when the list already exists.
pub fn lpushx<I, A>(key: impl Into<Arg>, values: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("lpushx", key).args(values)
}

pub fn rpushx<I, A>(key: impl Into<Arg>, values: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("rpushx", key).args(values)
}

pub fn linsert(
    key: impl Into<Arg>,
    position: ListPosition,
    pivot: impl Into<Arg>,
    value: impl Into<Arg>,
) -> Command {
    let position = match position {
        ListPosition::Before => "before",
        ListPosition::After => "after",
    };
    key_cmd("linsert", key).arg(position).arg(pivot).arg(value)
}

pub fn lpop(key: impl Into<Arg>) -> Command {
    key_cmd("lpop", key)
}

pub fn rpop(key: impl Into<Arg>) -> Command {
    key_cmd("rpop", key)
}

pub fn llen(key: impl Into<Arg>) -> Command {
    key_cmd("llen", key)
}

pub fn lrange(key: impl Into<Arg>, start: i64, stop: i64) -> Command {
    key_cmd("lrange", key).arg(start).arg(stop)
}

pub fn lindex(key: impl Into<Arg>, index: i64) -> Command {
    key_cmd("lindex", key).arg(index)
}

pub fn lset(key: impl Into<Arg>, index: i64, value: impl Into<Arg>) -> Command {
    key_cmd("lset", key).arg(index).arg(value)
}

pub fn lrem(key: impl Into<Arg>, count: i64, value: impl Into<Arg>) -> Command {
    key_cmd("lrem", key).arg(count).arg(value)
}

pub fn ltrim(key: impl Into<Arg>, start: i64, stop: i64) -> Command {
    key_cmd("ltrim", key).arg(start).arg(stop)
}

pub fn rpoplpush(src: impl Into<Arg>, dst: impl Into<Arg>) -> Command {
    key_cmd("rpoplpush", src).arg(dst)
}

/// `BLPOP`; the server blocks for up to `timeout` seconds (0 waits forever).
pub fn blpop<I, A>(keys: I, timeout: u64) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("blpop").args(keys).arg(timeout)
}

pub fn brpop<I, A>(keys: I, timeout: u64) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("brpop").args(keys).arg(timeout)
}

// sets

pub fn sadd<I, A>(key: impl Into<Arg>, members: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("sadd", key).args(members)
}

pub fn srem<I, A>(key: impl Into<Arg>, members: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("srem", key).args(members)
}

pub fn smembers(key: impl Into<Arg>) -> Command {
    key_cmd("smembers", key)
}

pub fn sismember(key: impl Into<Arg>, member: impl Into<Arg>) -> Command {
    key_cmd("sismember", key).arg(member)
}

pub fn scard(key: impl Into<Arg>) -> Command {
    key_cmd("scard", key)
}

pub fn spop(key: impl Into<Arg>) -> Command {
    key_cmd("spop", key)
}

/// `SRANDMEMBER key [count]`. A negative count allows repeats.
pub fn srandmember(key: impl Into<Arg>, count: Option<i64>) -> Command {
    let cmd = key_cmd("srandmember", key);
    match count {
        Some(count) => cmd.arg(count),
        None => cmd,
    }
}

pub fn smove(src: impl Into<Arg>, dst: impl Into<Arg>, member: impl Into<Arg>) -> Command {
    Command::new("smove").arg(src).arg(dst).arg(member)
}

pub fn sinter<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("sinter").args(keys)
}

pub fn sunion<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("sunion").args(keys)
}

pub fn sdiff<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("sdiff").args(keys)
}

pub fn sscan(key: impl Into<Arg>, cursor: u64, options: &ScanOptions) -> Command {
    options.apply(key_cmd("sscan", key).arg(cursor))
}

// sorted sets

/// `ZADD key score member [score member ...]`.
pub fn zadd<I, A>(key: impl Into<Arg>, items: I) -> ClientResult<Command>
where
    I: IntoIterator<Item = (f64, A)>,
    A: Into<Arg>,
{
    let mut cmd = key_cmd("zadd", key);
    let mut empty = true;
    for (score, member) in items {
        cmd = cmd.arg(score).arg(member);
        empty = false;
    }
    if empty {
        return Err(ClientError::InvalidArguments("zadd expects at least one member".to_string()));
    }
    Ok(cmd)
}

pub fn zrem<I, A>(key: impl Into<Arg>, members: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("zrem", key).args(members)
}

pub fn zcard(key: impl Into<Arg>) -> Command {
    key_cmd("zcard", key)
}

pub fn zscore(key: impl Into<Arg>, member: impl Into<Arg>) -> Command {
    key_cmd("zscore", key).arg(member)
}

pub fn zrank(key: impl Into<Arg>, member: impl Into<Arg>) -> Command {
    key_cmd("zrank", key).arg(member)
}

pub fn zincrby(key: impl Into<Arg>, increment: f64, member: impl Into<Arg>) -> Command {
    key_cmd("zincrby", key).arg(increment).arg(member)
}

pub fn zrange(key: impl Into<Arg>, start: i64, stop: i64, with_scores: bool) -> Command {
    let cmd = key_cmd("zrange", key).arg(start).arg(stop);
    if with_scores {
        cmd.arg("withscores")
    } else {
        cmd
    }
}

pub fn zrevrange(key: impl Into<Arg>, start: i64, stop: i64, with_scores: bool) -> Command {
    let cmd = key_cmd("zrevrange", key).arg(start).arg(stop);
    if with_scores {
        cmd.arg("withscores")
    } else {
        cmd
    }
}

/// `ZRANGEBYSCORE`. Bounds are passed through, so `-inf` and `(1.5` work.
pub fn zrangebyscore(
    key: impl Into<Arg>,
    min: impl Into<Arg>,
    max: impl Into<Arg>,
    limit: Option<(i64, i64)>,
) -> Command {
    let cmd = key_cmd("zrangebyscore", key).arg(min).arg(max);
    match limit {
        Some((offset, count)) => cmd.arg("limit").arg(offset).arg(count),
        None => cmd,
    }
}

pub fn zscan(key: impl Into<Arg>, cursor: u64, options: &ScanOptions) -> Command {
    options.apply(key_cmd("zscan", key).arg(cursor))
}

// hyperloglog

pub fn pfadd<I, A>(key: impl Into<Arg>, elements: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    key_cmd("pfadd", key).args(elements)
}

pub fn pfcount<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("pfcount").args(keys)
}

// pub/sub

pub fn publish(channel: impl Into<Arg>, message: impl Into<Arg>) -> Command {
    Command::new("publish").arg(channel).arg(message)
}

pub fn subscribe<I, A>(channels: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("subscribe").args(channels)
}

pub fn unsubscribe<I, A>(channels: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("unsubscribe").args(channels)
}

pub fn punsubscribe<I, A>(patterns: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("punsubscribe").args(patterns)
}

pub fn pubsub_channels(pattern: Option<&str>) -> Command {
    let cmd = Command::new("pubsub").arg("channels");
    match pattern {
        Some(pattern) => cmd.arg(pattern),
        None => cmd,
    }
}

pub fn pubsub_numsub<I, A>(channels: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("pubsub").arg("numsub").args(channels)
}

pub fn pubsub_numpat() -> Command {
    Command::new("pubsub").arg("numpat")
}

// scripting

/// `EVAL script numkeys key... arg...`.
pub fn eval<K, KA, V, VA>(script: impl Into<Arg>, keys: K, args: V) -> Command
where
    K: IntoIterator<Item = KA>,
    KA: Into<Arg>,
    V: IntoIterator<Item = VA>,
    VA: Into<Arg>,
{
    script_cmd("eval", script.into(), collect(keys), collect(args))
}

pub fn evalsha<K, KA, V, VA>(sha: impl Into<Arg>, keys: K, args: V) -> Command
where
    K: IntoIterator<Item = KA>,
    KA: Into<Arg>,
    V: IntoIterator<Item = VA>,
    VA: Into<Arg>,
{
    script_cmd("evalsha", sha.into(), collect(keys), collect(args))
}

fn script_cmd(name: &str, body: Arg, keys: Vec<Arg>, args: Vec<Arg>) -> Command {
    Command::new(name)
        .arg(body)
        .arg(keys.len())
        .args(keys)
        .args(args)
}

// transactions

pub fn multi() -> Command {
    Command::new("multi")
}

pub fn exec() -> Command {
    Command::new("exec")
}

pub fn discard() -> Command {
    Command::new("discard")
}

pub fn watch<I, A>(keys: I) -> Command
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    Command::new("watch").args(keys)
}

pub fn unwatch() -> Command {
    Command::new("unwatch")
}

// server

pub fn ping(message: Option<&str>) -> Command {
    let cmd = Command::new("ping");
    match message {
        Some(message) => cmd.arg(message),
        None => cmd,
    }
}

pub fn echo(message: impl Into<Arg>) -> Command {
    Command::new("echo").arg(message)
}

pub fn auth(password: impl Into<Arg>) -> Command {
    Command::new("auth").arg(password)
}

pub fn dbsize() -> Command {
    Command::new("dbsize")
}

pub fn flushdb() -> Command {
    Command::new("flushdb")
}
