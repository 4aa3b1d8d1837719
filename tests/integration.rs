use bytes::Bytes;
use mockdis::{
    cmd, AsyncCommands, Client, Cmd, CommandError, Commands, ErrorKind, Exec, Frame, Message,
    Promisified, Store,
};
use serial_test::serial;
use tokio::time::{self, Duration};

fn isolated() -> Client {
    Client::with_store(Store::new())
}

/// Runs every command in order and returns the replies, with errors rendered as error frames the
/// way a pipelined connection would see them.
fn pipeline(client: &mut Client, cmds: &[&[&str]]) -> Vec<Frame> {
    cmds.iter()
        .map(|parts| match client.call(Cmd::from(parts.to_vec())) {
            Ok(frame) => frame,
            Err(err) => Frame::Error(err.to_string()),
        })
        .collect()
}

fn kind(err: mockdis::Error) -> ErrorKind {
    err.downcast_ref::<CommandError>()
        .map(CommandError::kind)
        .expect("not a command error")
}

#[tokio::test]
#[serial]
async fn test_global_store_is_shared() {
    let mut a = Client::new();
    let mut b = Client::new();
    a.call(["FLUSHALL"]).unwrap();

    a.call(["SET", "shared", "1"]).unwrap();
    assert_eq!(b.call(["GET", "shared"]).unwrap(), Frame::from("1"));
    assert!(a.store().ptr_eq(&Store::global()));

    a.call(["FLUSHALL"]).unwrap();
}

#[tokio::test]
#[serial]
async fn test_set_and_get() {
    let mut client = Client::new();
    client.call(["FLUSHALL"]).unwrap();

    let replies = pipeline(
        &mut client,
        &[
            &["SET", "set_get_key_1", "1"],
            &["SET", "set_get_key_2", "Argentina"],
            &["GET", "set_get_key_1"],
            &["GET", "set_get_key_2"],
            &["GET", "set_get_nonexistentkey"],
        ],
    );

    assert_eq!(
        replies,
        vec![
            Frame::ok(),
            Frame::ok(),
            Frame::from("1"),
            Frame::from("Argentina"),
            Frame::Null,
        ]
    );

    let value = Bytes::from_static(b"\x00binary\xff");
    client.call(cmd("SET").arg("bin").arg(value.clone())).unwrap();
    assert_eq!(client.call(["GET", "bin"]).unwrap(), Frame::Bulk(value));

    client.call(["FLUSHALL"]).unwrap();
}

#[tokio::test]
async fn test_single_type_per_key() {
    let mut client = isolated();

    client.call(["RPUSH", "k", "a"]).unwrap();
    for parts in [
        &["GET", "k"][..],
        &["SADD", "k", "x"],
        &["HSET", "k", "f", "v"],
        &["ZADD", "k", "1", "m"],
        &["INCR", "k"],
    ] {
        let err = client.call(Cmd::from(parts.to_vec())).unwrap_err();
        assert_eq!(kind(err), ErrorKind::WrongType, "{:?}", parts);
    }

    assert_eq!(client.call(["TYPE", "k"]).unwrap(), Frame::Simple("list".to_string()));

    // SET replaces whatever was there.
    client.call(["SET", "k", "v"]).unwrap();
    assert_eq!(client.call(["TYPE", "k"]).unwrap(), Frame::Simple("string".to_string()));
}

#[tokio::test]
async fn test_expiration() {
    time::pause();
    let mut client = isolated();

    let replies = pipeline(
        &mut client,
        &[
            &["SET", "k", "v", "EX", "10"],
            &["TTL", "k"],
            &["PERSIST", "k"],
            &["PERSIST", "k"],
            &["TTL", "k"],
            &["TTL", "missing"],
            &["PEXPIRE", "k", "0"],
            &["EXISTS", "k"],
        ],
    );
    assert_eq!(
        replies,
        vec![
            Frame::ok(),
            Frame::Integer(10),
            Frame::Integer(1),
            Frame::Integer(0),
            Frame::Integer(-1),
            Frame::Integer(-2),
            Frame::Integer(1),
            Frame::Integer(0),
        ]
    );

    client.call(["SET", "short", "v", "PX", "1500"]).unwrap();
    time::advance(Duration::from_millis(1000)).await;
    assert_eq!(client.call(["PTTL", "short"]).unwrap(), Frame::Integer(500));
    time::advance(Duration::from_millis(600)).await;
    assert_eq!(client.call(["GET", "short"]).unwrap(), Frame::Null);
    assert_eq!(client.call(["DBSIZE"]).unwrap(), Frame::Integer(0));
}

#[tokio::test]
async fn test_overwrite_cancels_expiration() {
    time::pause();
    let mut client = isolated();

    client.call(["SET", "k", "v", "EX", "1"]).unwrap();
    client.call(["SET", "k", "w"]).unwrap();
    time::advance(Duration::from_secs(2)).await;

    assert_eq!(client.call(["GET", "k"]).unwrap(), Frame::from("w"));
    assert_eq!(client.call(["TTL", "k"]).unwrap(), Frame::Integer(-1));
}

#[tokio::test]
async fn test_sorted_set_ranks() {
    let mut client = isolated();
    client.call(["ZADD", "z", "1", "one", "2", "two", "3", "three"]).unwrap();

    let replies = pipeline(
        &mut client,
        &[
            &["ZRANK", "z", "one"],
            &["ZRANK", "z", "two"],
            &["ZRANK", "z", "three"],
            &["ZREVRANK", "z", "one"],
            &["ZRANK", "z", "missing"],
        ],
    );
    assert_eq!(
        replies,
        vec![
            Frame::Integer(0),
            Frame::Integer(1),
            Frame::Integer(2),
            Frame::Integer(2),
            Frame::Null,
        ]
    );

    assert_eq!(
        client.call(["ZRANGE", "z", "0", "-1"]).unwrap(),
        Frame::bulks(["one", "two", "three"])
    );
    assert_eq!(
        client.call(["ZRANGE", "z", "-2", "-1", "WITHSCORES"]).unwrap(),
        Frame::bulks(["two", "2", "three", "3"])
    );
    assert_eq!(
        client.call(["ZRANGEBYSCORE", "z", "(1", "+inf"]).unwrap(),
        Frame::bulks(["two", "three"])
    );
    assert_eq!(
        client.call(["ZREVRANGE", "z", "0", "0"]).unwrap(),
        Frame::bulks(["three"])
    );
}

#[tokio::test]
async fn test_weighted_union() {
    let mut client = isolated();
    client.call(["ZADD", "a", "1", "x", "2", "y"]).unwrap();
    client.call(["SADD", "b", "y", "z"]).unwrap();

    let stored = client
        .call(["ZUNIONSTORE", "out", "2", "a", "b", "WEIGHTS", "2", "3"])
        .unwrap();
    assert_eq!(stored, Frame::Integer(3));
    assert_eq!(
        client.call(["ZRANGE", "out", "0", "-1", "WITHSCORES"]).unwrap(),
        Frame::bulks(["x", "2", "z", "3", "y", "7"])
    );
}

#[tokio::test]
async fn test_set_algebra() {
    let mut client = isolated();
    client.call(["SADD", "a", "x", "y", "z"]).unwrap();
    client.call(["SADD", "b", "z", "w"]).unwrap();

    let diff = client.call(["SDIFF", "a", "b"]).unwrap().into_array().unwrap();
    assert_eq!(diff.len(), 2);

    assert_eq!(client.call(["SINTER", "a", "b"]).unwrap(), Frame::bulks(["z"]));
    assert_eq!(
        client.call(["SUNIONSTORE", "u", "a", "b"]).unwrap(),
        Frame::Integer(4)
    );
    assert_eq!(
        client.call(["SINTERSTORE", "empty", "a", "missing"]).unwrap(),
        Frame::Integer(0)
    );
    assert_eq!(client.call(["EXISTS", "empty"]).unwrap(), Frame::Integer(0));
}

#[tokio::test]
async fn test_hash_commands_against_a_string() {
    let mut client = isolated();
    client.call(["SET", "s", "v"]).unwrap();

    let commands: &[&[&str]] = &[
        &["HSET", "s", "f", "v"],
        &["HMSET", "s", "f", "v"],
        &["HSETNX", "s", "f", "v"],
        &["HGET", "s", "f"],
        &["HMGET", "s", "f"],
        &["HGETALL", "s"],
        &["HDEL", "s", "f"],
        &["HEXISTS", "s", "f"],
        &["HLEN", "s"],
        &["HKEYS", "s"],
        &["HVALS", "s"],
        &["HSTRLEN", "s", "f"],
        &["HINCRBY", "s", "f", "1"],
        &["HINCRBYFLOAT", "s", "f", "1.5"],
        &["HSCAN", "s", "0"],
    ];

    for reply in pipeline(&mut client, commands) {
        match reply {
            Frame::Error(message) => assert!(message.contains("WRONGTYPE"), "{}", message),
            frame => panic!("expected an error, got {:?}", frame),
        }
    }
}

#[tokio::test]
async fn test_lists() {
    let mut client = isolated();

    let replies = pipeline(
        &mut client,
        &[
            &["RPUSH", "l", "a", "b", "c"],
            &["LPOP", "l"],
            &["RPOPLPUSH", "l", "other"],
            &["LRANGE", "other", "0", "-1"],
            &["LMOVE", "l", "other", "LEFT", "RIGHT"],
            &["EXISTS", "l"],
            &["LRANGE", "other", "0", "-1"],
        ],
    );
    assert_eq!(
        replies,
        vec![
            Frame::Integer(3),
            Frame::from("a"),
            Frame::from("c"),
            Frame::bulks(["c"]),
            Frame::from("b"),
            Frame::Integer(0),
            Frame::bulks(["c", "b"]),
        ]
    );
}

#[tokio::test]
async fn test_transaction_commit() {
    let mut client = isolated();

    let replies = pipeline(
        &mut client,
        &[
            &["MULTI"],
            &["SET", "k", "1"],
            &["INCR", "k"],
            &["LPUSH", "k", "x"],
            &["EXEC"],
        ],
    );

    let queued = Frame::Simple("QUEUED".to_string());
    assert_eq!(replies[..4], [Frame::ok(), queued.clone(), queued.clone(), queued]);
    assert_eq!(
        replies[4],
        Frame::Array(vec![
            Frame::ok(),
            Frame::Integer(2),
            Frame::Error(CommandError::WrongType.to_string()),
        ])
    );
}

#[tokio::test]
async fn test_transaction_abort() {
    let mut client = isolated();
    let mut other = client.copy();

    client.call(["WATCH", "k"]).unwrap();
    other.call(["SET", "k", "theirs"]).unwrap();

    let mut tx = client.multi();
    tx.call(["SET", "k", "mine"]).unwrap();
    assert!(matches!(tx.exec().unwrap(), Exec::Aborted));
    assert_eq!(client.call(["GET", "k"]).unwrap(), Frame::from("theirs"));

    // A watched key that nobody touched lets the transaction through.
    client.call(["WATCH", "k"]).unwrap();
    let mut tx = client.multi();
    tx.call(["SET", "k", "mine"]).unwrap();
    assert!(!tx.exec().unwrap().is_aborted());
    assert_eq!(client.call(["GET", "k"]).unwrap(), Frame::from("mine"));
}

#[tokio::test]
async fn test_arity_errors_name_the_command() {
    let mut client = isolated();

    for (parts, name) in [
        (&["GET"][..], "get"),
        (&["HSET", "h", "f"], "hset"),
        (&["ZADD", "z"], "zadd"),
        (&["lrange", "l", "0"], "lrange"),
    ] {
        let err = client.call(Cmd::from(parts.to_vec())).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("ERR wrong number of arguments for '{}' command", name)
        );
    }
}

#[tokio::test]
async fn test_unsupported_and_unknown_commands() {
    let mut client = isolated();

    for name in ["EVAL", "SORT", "OBJECT", "CLIENT", "BLPOP"] {
        let err = client.call(cmd(name).arg("x").arg("0")).unwrap_err();
        assert_eq!(kind(err), ErrorKind::NotSupported, "{}", name);
    }

    let err = client.call(["FROBNICATE"]).unwrap_err();
    assert_eq!(err.to_string(), "ERR unknown command 'frobnicate'");
}

#[tokio::test]
async fn test_pubsub() {
    let mut subscriber = isolated();
    let mut publisher = subscriber.copy();

    assert_eq!(
        subscriber.call(["SUBSCRIBE", "news"]).unwrap(),
        Frame::Integer(1)
    );
    assert_eq!(
        subscriber.call(["PSUBSCRIBE", "news.*"]).unwrap(),
        Frame::Integer(2)
    );
    assert_eq!(
        subscriber.next_message().await,
        Some(Message::Subscribe {
            channel: "news".to_string(),
            count: 1
        })
    );
    subscriber.next_message().await;

    assert_eq!(
        publisher.call(["PUBLISH", "news.sports", "goal"]).unwrap(),
        Frame::Integer(1)
    );
    assert_eq!(
        subscriber.next_message().await,
        Some(Message::PMessage {
            pattern: "news.*".to_string(),
            channel: "news.sports".to_string(),
            payload: Bytes::from("goal"),
        })
    );

    drop(subscriber);
    assert_eq!(publisher.call(["PUBLISH", "news", "x"]).unwrap(), Frame::Integer(0));
}

#[tokio::test]
async fn test_async_layer() {
    let mut client = isolated();

    client.call_async(["SET", "k", "1"]).await.unwrap();
    assert_eq!(client.incr("k", 2).unwrap(), 3);

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.call_with(["GET", "k"], move |result| {
        let _ = tx.send(result.ok());
    });
    assert_eq!(rx.await.unwrap(), Some(Frame::from("3")));

    let mut deferred = Promisified::deferred(client);
    assert_eq!(deferred.get("k").await.unwrap(), Some(Bytes::from("3")));
    assert_eq!(deferred.hset("h", "f", "v").await.unwrap(), 1);
}

#[tokio::test]
async fn test_copies_and_isolation() {
    let mut client = isolated();
    client.call(["SET", "k", "1"]).unwrap();

    let mut copy = client.copy();
    let mut snapshot = client.isolated_copy();
    let mut fresh = client.isolated();

    client.call(["SET", "k", "2"]).unwrap();

    assert_eq!(copy.call(["GET", "k"]).unwrap(), Frame::from("2"));
    assert_eq!(snapshot.call(["GET", "k"]).unwrap(), Frame::from("1"));
    assert_eq!(fresh.call(["GET", "k"]).unwrap(), Frame::Null);
    assert_ne!(copy.id(), client.id());
}
