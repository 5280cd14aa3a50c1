//! 端到端摄取测试
//!
//! 通过事件通道驱动会话线程，验证：
//! 1. 连接后订阅命令与配置主题
//! 2. 配置文档经路由写入导航图，读者看到完整快照
//! 3. 命令主题上的已知/未知命令
//! 4. 未知主题不产生任何状态变化

use linebot_link::{
    CommandSink, LinkEvent, LoopbackTransport, Router, Session, SharedGraph,
};
use linebot_protocol::{Qos, Topics};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct Actions(Arc<Mutex<Vec<&'static str>>>);

impl CommandSink for Actions {
    fn start(&mut self) {
        self.0.lock().push("start");
    }

    fn stop(&mut self) {
        self.0.lock().push("stop");
    }
}

struct Running {
    events: crossbeam_channel::Sender<LinkEvent>,
    graph: Arc<SharedGraph>,
    actions: Actions,
    transport: LoopbackTransport,
    is_running: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

fn spawn_session() -> Running {
    let (tx, rx) = crossbeam_channel::unbounded();
    let graph = Arc::new(SharedGraph::new());
    let actions = Actions::default();
    let transport = LoopbackTransport::new().with_acks(tx.clone());
    let is_running = Arc::new(AtomicBool::new(true));

    let mut session = Session::new(Router::new(Topics::default(), graph.clone(), actions.clone()));
    session.attach(transport.clone());

    let handle = {
        let is_running = is_running.clone();
        thread::spawn(move || session.run(&rx, Duration::from_millis(10), &is_running))
    };

    Running {
        events: tx,
        graph,
        actions,
        transport,
        is_running,
        handle,
    }
}

fn data(topic: &str, payload: &[u8]) -> LinkEvent {
    LinkEvent::Data {
        topic: topic.to_string(),
        payload: payload.to_vec(),
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn stop(running: Running) {
    running.is_running.store(false, Ordering::Release);
    running.handle.join().unwrap();
}

#[test]
fn test_connect_subscribes_command_and_config() {
    let running = spawn_session();
    running.events.send(LinkEvent::Connected).unwrap();

    assert!(wait_until(|| running.transport.subscriptions().len() == 2));
    let subscriptions = running.transport.subscriptions();
    assert!(subscriptions.iter().all(|(_, qos)| *qos == Qos::AtMostOnce));
    assert_eq!(subscriptions[0].0, "/robot/command");
    assert_eq!(subscriptions[1].0, "/robot/config");
    stop(running);
}

#[test]
fn test_config_document_populates_graph() {
    let running = spawn_session();
    let doc = br#"{"nodes":[{"id":"A"},{"id":"B"}],"edges":[{"from":"A","to":"B","distance":5.0,"turn":"straight"}]}"#;
    running.events.send(data("/robot/config", doc)).unwrap();

    assert!(wait_until(|| running.graph.edge_count() == 1));
    let snapshot = running.graph.snapshot();
    assert_eq!(snapshot.node_count(), 2);
    let edge = &snapshot.edges()[0];
    assert_eq!(edge.from, "A");
    assert_eq!(edge.to, "B");
    assert_eq!(edge.distance, 5.0);
    assert_eq!(edge.turn, "straight");
    stop(running);
}

#[test]
fn test_edge_missing_field_is_skipped() {
    let running = spawn_session();
    let doc = br#"{"edges":[{"from":"A","to":"B","distance":5.0,"turn":"straight"},{"from":"B","distance":2.0,"turn":"left"}]}"#;
    running.events.send(data("/robot/config", doc)).unwrap();

    assert!(wait_until(|| running.graph.edge_count() == 1));
    // 没有 nodes 数组：节点保持为空
    assert_eq!(running.graph.node_count(), 0);
    stop(running);
}

#[test]
fn test_commands_on_command_topic() {
    let running = spawn_session();
    running.events.send(data("/robot/command", b"start")).unwrap();
    running.events.send(data("/robot/command", b"pause")).unwrap();
    running.events.send(data("/robot/command", b"stop")).unwrap();

    assert!(wait_until(|| running.actions.0.lock().len() == 2));
    assert_eq!(*running.actions.0.lock(), vec!["start", "stop"]);
    stop(running);
}

#[test]
fn test_unknown_topic_and_bad_config_change_nothing() {
    let running = spawn_session();
    running
        .events
        .send(data("/robot/config", br#"{"nodes":[{"id":"keep"}]}"#))
        .unwrap();
    assert!(wait_until(|| running.graph.node_count() == 1));
    let before = running.graph.snapshot();

    running.events.send(data("/robot/status", b"start")).unwrap();
    running.events.send(data("/robot/config", b"{\"nodes\": [")).unwrap();
    // 以一条可观察的命令作为屏障，确认前面的消息都已处理
    running.events.send(data("/robot/command", b"stop")).unwrap();
    assert!(wait_until(|| !running.actions.0.lock().is_empty()));

    assert_eq!(*running.actions.0.lock(), vec!["stop"]);
    assert!(Arc::ptr_eq(&before, &running.graph.snapshot()));
    stop(running);
}
