//! Typed command methods on `Client`.
//!
//! Each method builds its command with `cmd`, runs it through
//! `Client::query`, and projects the reply to the shape the command returns.

use std::time::Duration;

use crate::client::{Client, Ttl};
use crate::cmd::{self, ListPosition, ScanOptions, SetOptions};
use crate::conn::Dialer;
use crate::error::{ClientError, ClientResult};
use crate::reply::{Arg, Reply};

fn ok(reply: Reply) -> ClientResult<()> {
    reply.into_status().map(|_| ())
}

fn pair_up(items: Vec<String>) -> ClientResult<Vec<(String, String)>> {
    if items.len() % 2 != 0 {
        return Err(ClientError::UnexpectedResponse {
            expected: "even-length array",
            found: "array",
        });
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        pairs.push((a, b));
    }
    Ok(pairs)
}

/// Millisecond arguments must fit the server's signed 64-bit range.
fn millis(ttl: Duration) -> ClientResult<u64> {
    i64::try_from(ttl.as_millis())
        .map(|value| value as u64)
        .map_err(|_| ClientError::InvalidArguments(format!("duration {:?} overflows milliseconds", ttl)))
}

fn parse_score(text: String) -> ClientResult<f64> {
    Reply::Bulk(text).into_float()
}

impl<D: Dialer> Client<D> {
    // strings

    /// Fetches a value by key. Returns `Ok(None)` when the key is missing.
    pub async fn get(&self, key: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::get(key)).await?.into_opt_string()
    }

    /// Sets a value. Returns false when an `NX`/`XX` condition prevented it.
    pub async fn set(
        &self,
        key: impl Into<Arg>,
        value: impl Into<Arg>,
        options: &SetOptions,
    ) -> ClientResult<bool> {
        match self.query(&cmd::set(key, value, options)).await? {
            Reply::Nil => Ok(false),
            reply => ok(reply).map(|_| true),
        }
    }

    pub async fn append(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::append(key, value)).await?.into_integer()
    }

    pub async fn strlen(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::strlen(key)).await?.into_integer()
    }

    pub async fn incr(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::incr(key)).await?.into_integer()
    }

    pub async fn incrby(&self, key: impl Into<Arg>, increment: i64) -> ClientResult<i64> {
        self.query(&cmd::incrby(key, increment)).await?.into_integer()
    }

    pub async fn incrbyfloat(&self, key: impl Into<Arg>, increment: f64) -> ClientResult<f64> {
        self.query(&cmd::incrbyfloat(key, increment)).await?.into_float()
    }

    pub async fn decr(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::decr(key)).await?.into_integer()
    }

    pub async fn decrby(&self, key: impl Into<Arg>, decrement: i64) -> ClientResult<i64> {
        self.query(&cmd::decrby(key, decrement)).await?.into_integer()
    }

    pub async fn getset(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::getset(key, value)).await?.into_opt_string()
    }

    pub async fn setnx(&self, key: impl Into<Arg>, value: impl Into<Arg>) -> ClientResult<bool> {
        self.query(&cmd::setnx(key, value)).await?.into_bool()
    }

    pub async fn setex(&self, key: impl Into<Arg>, ttl: Duration, value: impl Into<Arg>) -> ClientResult<()> {
        ok(self.query(&cmd::setex(key, ttl.as_secs(), value)).await?)
    }

    pub async fn psetex(&self, key: impl Into<Arg>, ttl: Duration, value: impl Into<Arg>) -> ClientResult<()> {
        ok(self.query(&cmd::psetex(key, millis(ttl)?, value)).await?)
    }

    pub async fn getrange(&self, key: impl Into<Arg>, start: i64, end: i64) -> ClientResult<String> {
        self.query(&cmd::getrange(key, start, end)).await?.into_string()
    }

    pub async fn setrange(&self, key: impl Into<Arg>, offset: u64, value: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::setrange(key, offset, value)).await?.into_integer()
    }

    pub async fn mget<I, A>(&self, keys: I) -> ClientResult<Vec<Option<String>>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::mget(keys)).await?.into_opt_string_vec()
    }

    /// Sets several keys; `kvs` is a flat key/value list.
    pub async fn mset<I, A>(&self, kvs: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        ok(self.query(&cmd::mset(kvs)?).await?)
    }

    pub async fn msetnx<I, A>(&self, kvs: I) -> ClientResult<bool>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::msetnx(kvs)?).await?.into_bool()
    }

    pub async fn getbit(&self, key: impl Into<Arg>, offset: u64) -> ClientResult<i64> {
        self.query(&cmd::getbit(key, offset)).await?.into_integer()
    }

    /// Returns the previous bit value.
    pub async fn setbit(&self, key: impl Into<Arg>, offset: u64, bit: bool) -> ClientResult<i64> {
        self.query(&cmd::setbit(key, offset, bit)).await?.into_integer()
    }

    pub async fn bitcount(&self, key: impl Into<Arg>, range: Option<(i64, i64)>) -> ClientResult<i64> {
        self.query(&cmd::bitcount(key, range)).await?.into_integer()
    }

    // keys

    /// Deletes keys. Returns how many existed.
    pub async fn del<I, A>(&self, keys: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::del(keys)).await?.into_integer()
    }

    pub async fn exists<I, A>(&self, keys: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::exists(keys)).await?.into_integer()
    }

    pub async fn unlink<I, A>(&self, keys: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::unlink(keys)).await?.into_integer()
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set.
    pub async fn expire(&self, key: impl Into<Arg>, ttl: Duration) -> ClientResult<bool> {
        self.query(&cmd::expire(key, ttl.as_secs())).await?.into_bool()
    }

    pub async fn pexpire(&self, key: impl Into<Arg>, ttl: Duration) -> ClientResult<bool> {
        self.query(&cmd::pexpire(key, millis(ttl)?)).await?.into_bool()
    }

    pub async fn expireat(&self, key: impl Into<Arg>, unix_seconds: u64) -> ClientResult<bool> {
        self.query(&cmd::expireat(key, unix_seconds)).await?.into_bool()
    }

    pub async fn ttl(&self, key: impl Into<Arg>) -> ClientResult<Ttl> {
        Ttl::from_reply(self.query(&cmd::ttl(key)).await?, Duration::from_secs)
    }

    pub async fn pttl(&self, key: impl Into<Arg>) -> ClientResult<Ttl> {
        Ttl::from_reply(self.query(&cmd::pttl(key)).await?, Duration::from_millis)
    }

    pub async fn persist(&self, key: impl Into<Arg>) -> ClientResult<bool> {
        self.query(&cmd::persist(key)).await?.into_bool()
    }

    pub async fn rename(&self, src: impl Into<Arg>, dst: impl Into<Arg>) -> ClientResult<()> {
        ok(self.query(&cmd::rename(src, dst)).await?)
    }

    pub async fn renamenx(&self, src: impl Into<Arg>, dst: impl Into<Arg>) -> ClientResult<bool> {
        self.query(&cmd::renamenx(src, dst)).await?.into_bool()
    }

    pub async fn keys(&self, pattern: impl Into<Arg>) -> ClientResult<Vec<String>> {
        self.query(&cmd::keys(pattern)).await?.into_string_vec()
    }

    pub async fn randomkey(&self) -> ClientResult<Option<String>> {
        self.query(&cmd::randomkey()).await?.into_opt_string()
    }

    /// One `SCAN` step. Returns the next cursor and the batch of keys.
    pub async fn scan(&self, cursor: u64, options: &ScanOptions) -> ClientResult<(u64, Vec<String>)> {
        crate::scan::split_batch(self.query(&cmd::scan(cursor, options)).await?)
    }

    // hashes

    pub async fn hset(
        &self,
        key: impl Into<Arg>,
        field: impl Into<Arg>,
        value: impl Into<Arg>,
    ) -> ClientResult<i64> {
        self.query(&cmd::hset(key, field, value)).await?.into_integer()
    }

    pub async fn hget(&self, key: impl Into<Arg>, field: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::hget(key, field)).await?.into_opt_string()
    }

    pub async fn hdel<I, A>(&self, key: impl Into<Arg>, fields: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::hdel(key, fields)).await?.into_integer()
    }

    pub async fn hexists(&self, key: impl Into<Arg>, field: impl Into<Arg>) -> ClientResult<bool> {
        self.query(&cmd::hexists(key, field)).await?.into_bool()
    }

    /// All field/value pairs of a hash, in server order.
    pub async fn hgetall(&self, key: impl Into<Arg>) -> ClientResult<Vec<(String, String)>> {
        pair_up(self.query(&cmd::hgetall(key)).await?.into_string_vec()?)
    }

    pub async fn hkeys(&self, key: impl Into<Arg>) -> ClientResult<Vec<String>> {
        self.query(&cmd::hkeys(key)).await?.into_string_vec()
    }

    pub async fn hvals(&self, key: impl Into<Arg>) -> ClientResult<Vec<String>> {
        self.query(&cmd::hvals(key)).await?.into_string_vec()
    }

    pub async fn hlen(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::hlen(key)).await?.into_integer()
    }

    pub async fn hincrby(&self, key: impl Into<Arg>, field: impl Into<Arg>, increment: i64) -> ClientResult<i64> {
        self.query(&cmd::hincrby(key, field, increment)).await?.into_integer()
    }

    pub async fn hincrbyfloat(
        &self,
        key: impl Into<Arg>,
        field: impl Into<Arg>,
        increment: f64,
    ) -> ClientResult<f64> {
        self.query(&cmd::hincrbyfloat(key, field, increment)).await?.into_float()
    }

    pub async fn hmget<I, A>(&self, key: impl Into<Arg>, fields: I) -> ClientResult<Vec<Option<String>>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::hmget(key, fields)).await?.into_opt_string_vec()
    }

    pub async fn hmset<I, A>(&self, key: impl Into<Arg>, field_values: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        ok(self.query(&cmd::hmset(key, field_values)?).await?)
    }

    pub async fn hsetnx(
        &self,
        key: impl Into<Arg>,
        field: impl Into<Arg>,
        value: impl Into<Arg>,
    ) -> ClientResult<bool> {
        self.query(&cmd::hsetnx(key, field, value)).await?.into_bool()
    }

    pub async fn hstrlen(&self, key: impl Into<Arg>, field: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::hstrlen(key, field)).await?.into_integer()
    }

    // lists

    pub async fn lpush<I, A>(&self, key: impl Into<Arg>, values: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::lpush(key, values)).await?.into_integer()
    }

    pub async fn rpush<I, A>(&self, key: impl Into<Arg>, values: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::rpush(key, values)).await?.into_integer()
    }

    /// Pushes only onto an existing list. Returns the new length, 0 if absent.
    pub async fn lpushx<I, A>(&self, key: impl Into<Arg>, values: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::lpushx(key, values)).await?.into_integer()
    }

    pub async fn rpushx<I, A>(&self, key: impl Into<Arg>, values: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::rpushx(key, values)).await?.into_integer()
    }

    /// Returns the new length, or -1 when the pivot was not found.
    pub async fn linsert(
        &self,
        key: impl Into<Arg>,
        position: ListPosition,
        pivot: impl Into<Arg>,
        value: impl Into<Arg>,
    ) -> ClientResult<i64> {
        self.query(&cmd::linsert(key, position, pivot, value)).await?.into_integer()
    }

    pub async fn lpop(&self, key: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::lpop(key)).await?.into_opt_string()
    }

    pub async fn rpop(&self, key: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::rpop(key)).await?.into_opt_string()
    }

    pub async fn llen(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::llen(key)).await?.into_integer()
    }

    pub async fn lrange(&self, key: impl Into<Arg>, start: i64, stop: i64) -> ClientResult<Vec<String>> {
        self.query(&cmd::lrange(key, start, stop)).await?.into_string_vec()
    }

    pub async fn lindex(&self, key: impl Into<Arg>, index: i64) -> ClientResult<Option<String>> {
        self.query(&cmd::lindex(key, index)).await?.into_opt_string()
    }

    pub async fn lset(&self, key: impl Into<Arg>, index: i64, value: impl Into<Arg>) -> ClientResult<()> {
        ok(self.query(&cmd::lset(key, index, value)).await?)
    }

    pub async fn lrem(&self, key: impl Into<Arg>, count: i64, value: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::lrem(key, count, value)).await?.into_integer()
    }

    pub async fn ltrim(&self, key: impl Into<Arg>, start: i64, stop: i64) -> ClientResult<()> {
        ok(self.query(&cmd::ltrim(key, start, stop)).await?)
    }

    pub async fn rpoplpush(&self, src: impl Into<Arg>, dst: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::rpoplpush(src, dst)).await?.into_opt_string()
    }

    /// Blocks on the server for up to `timeout`; `None` when it expires.
    ///
    /// The client enforces no timeout of its own.
    pub async fn blpop<I, A>(&self, keys: I, timeout: Duration) -> ClientResult<Option<(String, String)>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        popped(self.query(&cmd::blpop(keys, timeout.as_secs())).await?)
    }

    pub async fn brpop<I, A>(&self, keys: I, timeout: Duration) -> ClientResult<Option<(String, String)>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        popped(self.query(&cmd::brpop(keys, timeout.as_secs())).await?)
    }

    // sets

    pub async fn sadd<I, A>(&self, key: impl Into<Arg>, members: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::sadd(key, members)).await?.into_integer()
    }

    pub async fn srem<I, A>(&self, key: impl Into<Arg>, members: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::srem(key, members)).await?.into_integer()
    }

    pub async fn smembers(&self, key: impl Into<Arg>) -> ClientResult<Vec<String>> {
        self.query(&cmd::smembers(key)).await?.into_string_vec()
    }

    pub async fn sismember(&self, key: impl Into<Arg>, member: impl Into<Arg>) -> ClientResult<bool> {
        self.query(&cmd::sismember(key, member)).await?.into_bool()
    }

    pub async fn scard(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::scard(key)).await?.into_integer()
    }

    pub async fn spop(&self, key: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::spop(key)).await?.into_opt_string()
    }

    pub async fn srandmember(&self, key: impl Into<Arg>) -> ClientResult<Option<String>> {
        self.query(&cmd::srandmember(key, None)).await?.into_opt_string()
    }

    pub async fn srandmember_count(&self, key: impl Into<Arg>, count: i64) -> ClientResult<Vec<String>> {
        self.query(&cmd::srandmember(key, Some(count))).await?.into_string_vec()
    }

    pub async fn smove(
        &self,
        src: impl Into<Arg>,
        dst: impl Into<Arg>,
        member: impl Into<Arg>,
    ) -> ClientResult<bool> {
        self.query(&cmd::smove(src, dst, member)).await?.into_bool()
    }

    pub async fn sinter<I, A>(&self, keys: I) -> ClientResult<Vec<String>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::sinter(keys)).await?.into_string_vec()
    }

    pub async fn sunion<I, A>(&self, keys: I) -> ClientResult<Vec<String>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::sunion(keys)).await?.into_string_vec()
    }

    pub async fn sdiff<I, A>(&self, keys: I) -> ClientResult<Vec<String>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::sdiff(keys)).await?.into_string_vec()
    }

    // sorted sets

    pub async fn zadd<I, A>(&self, key: impl Into<Arg>, items: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = (f64, A)>,
        A: Into<Arg>,
    {
        self.query(&cmd::zadd(key, items)?).await?.into_integer()
    }

    pub async fn zrem<I, A>(&self, key: impl Into<Arg>, members: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::zrem(key, members)).await?.into_integer()
    }

    pub async fn zcard(&self, key: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::zcard(key)).await?.into_integer()
    }

    pub async fn zscore(&self, key: impl Into<Arg>, member: impl Into<Arg>) -> ClientResult<Option<f64>> {
        self.query(&cmd::zscore(key, member)).await?.into_opt_float()
    }

    pub async fn zrank(&self, key: impl Into<Arg>, member: impl Into<Arg>) -> ClientResult<Option<i64>> {
        self.query(&cmd::zrank(key, member)).await?.into_opt_integer()
    }

    pub async fn zincrby(&self, key: impl Into<Arg>, increment: f64, member: impl Into<Arg>) -> ClientResult<f64> {
        self.query(&cmd::zincrby(key, increment, member)).await?.into_float()
    }

    pub async fn zrange(&self, key: impl Into<Arg>, start: i64, stop: i64) -> ClientResult<Vec<String>> {
        self.query(&cmd::zrange(key, start, stop, false)).await?.into_string_vec()
    }

    pub async fn zrange_withscores(
        &self,
        key: impl Into<Arg>,
        start: i64,
        stop: i64,
    ) -> ClientResult<Vec<(String, f64)>> {
        let flat = self.query(&cmd::zrange(key, start, stop, true)).await?.into_string_vec()?;
        pair_up(flat)?
            .into_iter()
            .map(|(member, score)| Ok((member, parse_score(score)?)))
            .collect()
    }

    pub async fn zrevrange(&self, key: impl Into<Arg>, start: i64, stop: i64) -> ClientResult<Vec<String>> {
        self.query(&cmd::zrevrange(key, start, stop, false)).await?.into_string_vec()
    }

    /// Members with scores between `min` and `max`, lowest first.
    pub async fn zrangebyscore(
        &self,
        key: impl Into<Arg>,
        min: impl Into<Arg>,
        max: impl Into<Arg>,
        limit: Option<(i64, i64)>,
    ) -> ClientResult<Vec<String>> {
        self.query(&cmd::zrangebyscore(key, min, max, limit)).await?.into_string_vec()
    }

    // hyperloglog

    /// Returns true when the estimated cardinality changed.
    pub async fn pfadd<I, A>(&self, key: impl Into<Arg>, elements: I) -> ClientResult<bool>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::pfadd(key, elements)).await?.into_bool()
    }

    pub async fn pfcount<I, A>(&self, keys: I) -> ClientResult<i64>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.query(&cmd::pfcount(keys)).await?.into_integer()
    }

    // pub/sub

    /// Returns how many subscribers received the message.
    pub async fn publish(&self, channel: impl Into<Arg>, message: impl Into<Arg>) -> ClientResult<i64> {
        self.query(&cmd::publish(channel, message)).await?.into_integer()
    }

    pub async fn pubsub_channels(&self, pattern: Option<&str>) -> ClientResult<Vec<String>> {
        self.query(&cmd::pubsub_channels(pattern)).await?.into_string_vec()
    }

    pub async fn pubsub_numsub<I, A>(&self, channels: I) -> ClientResult<Vec<(String, i64)>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let items = self.query(&cmd::pubsub_numsub(channels)).await?.into_array()?;
        if items.len() % 2 != 0 {
            return Err(ClientError::UnexpectedResponse {
                expected: "even-length array",
                found: "array",
            });
        }
        let mut counts = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(channel), Some(count)) = (iter.next(), iter.next()) {
            counts.push((channel.into_string()?, count.into_integer()?));
        }
        Ok(counts)
    }

    pub async fn pubsub_numpat(&self) -> ClientResult<i64> {
        self.query(&cmd::pubsub_numpat()).await?.into_integer()
    }

    // scripting

    /// Runs a script; the reply shape depends on the script.
    pub async fn eval<K, KA, V, VA>(&self, script: impl Into<Arg>, keys: K, args: V) -> ClientResult<Reply>
    where
        K: IntoIterator<Item = KA>,
        KA: Into<Arg>,
        V: IntoIterator<Item = VA>,
        VA: Into<Arg>,
    {
        self.query(&cmd::eval(script, keys, args)).await
    }

    pub async fn evalsha<K, KA, V, VA>(&self, sha: impl Into<Arg>, keys: K, args: V) -> ClientResult<Reply>
    where
        K: IntoIterator<Item = KA>,
        KA: Into<Arg>,
        V: IntoIterator<Item = VA>,
        VA: Into<Arg>,
    {
        self.query(&cmd::evalsha(sha, keys, args)).await
    }

    // server

    /// Pings the server. Returns `PONG` or the echoed message.
    pub async fn ping(&self, message: Option<&str>) -> ClientResult<String> {
        self.query(&cmd::ping(message)).await?.into_status()
    }

    pub async fn echo(&self, message: impl Into<Arg>) -> ClientResult<String> {
        self.query(&cmd::echo(message)).await?.into_string()
    }

    /// Authenticates whichever pooled connection serves this call.
    ///
    /// Use `ClientConfig::password` to authenticate every connection.
    pub async fn auth(&self, password: impl Into<Arg>) -> ClientResult<()> {
        ok(self.query(&cmd::auth(password)).await?)
    }

    pub async fn dbsize(&self) -> ClientResult<i64> {
        self.query(&cmd::dbsize()).await?.into_integer()
    }

    pub async fn flushdb(&self) -> ClientResult<()> {
        ok(self.query(&cmd::flushdb()).await?)
    }
}

fn popped(reply: Reply) -> ClientResult<Option<(String, String)>> {
    let Some(items) = reply.into_opt_array()? else {
        return Ok(None);
    };
    let texts = items
        .into_iter()
        .map(Reply::into_string)
        .collect::<ClientResult<Vec<_>>>()?;
    let mut pairs = pair_up(texts)?;
    match (pairs.len(), pairs.pop()) {
        (1, Some(pair)) => Ok(Some(pair)),
        _ => Err(ClientError::UnexpectedResponse {
            expected: "key/value pair",
            found: "array",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_up_requires_even_length() {
        let pairs = pair_up(vec!["a".into(), "1".into(), "b".into(), "2".into()]).unwrap();
        assert_eq!(pairs, vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
        assert!(pair_up(vec!["a".into()]).is_err());
    }

    #[test]
    fn millis_rejects_overflowing_durations() {
        assert_eq!(millis(Duration::from_millis(1500)).unwrap(), 1500);
        assert!(matches!(
            millis(Duration::from_secs(u64::MAX)),
            Err(ClientError::InvalidArguments(_))
        ));
    }

    #[test]
    fn popped_handles_timeout_and_pair() {
        assert_eq!(popped(Reply::Nil).unwrap(), None);
        let reply = Reply::Array(vec![Reply::Bulk("list".into()), Reply::Bulk("item".into())]);
        assert_eq!(popped(reply).unwrap(), Some(("list".into(), "item".into())));
    }
}
