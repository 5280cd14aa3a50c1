//! 远程命令处理

use linebot_protocol::Command;
use tracing::{info, warn};

/// 命令的执行端
///
/// `start` / `stop` 各自对应一个独立的动作；未知命令不会到达这里。
pub trait CommandSink: Send {
    fn start(&mut self);
    fn stop(&mut self);
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// 只输出日志的执行端
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCommandSink;

impl CommandSink for LogCommandSink {
    fn start(&mut self) {
        info!("Starting robot...");
    }

    fn stop(&mut self) {
        info!("Stopping robot...");
    }
}

/// 命令处理器
pub struct CommandProcessor<S> {
    sink: S,
}

impl<S: CommandSink> CommandProcessor<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// 解析并执行一条命令文本（精确、大小写敏感）
    pub fn process(&mut self, text: &str) -> Command {
        let command = Command::parse(text);
        match &command {
            Command::Start => self.sink.start(),
            Command::Stop => self.sink.stop(),
            Command::Unknown(raw) => warn!("Unknown command: {:?}", raw),
        }
        command
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// 记录收到的动作
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) actions: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RecordingSink {
        pub(crate) fn actions(&self) -> Vec<&'static str> {
            self.actions.lock().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn start(&mut self) {
            self.actions.lock().push("start");
        }

        fn stop(&mut self) {
            self.actions.lock().push("stop");
        }
    }

    #[test]
    fn test_known_commands_reach_sink() {
        let sink = RecordingSink::default();
        let mut processor = CommandProcessor::new(sink.clone());

        assert_eq!(processor.process("start"), Command::Start);
        assert_eq!(processor.process("stop"), Command::Stop);
        assert_eq!(sink.actions(), vec!["start", "stop"]);
    }

    #[test]
    fn test_unknown_commands_do_nothing() {
        let sink = RecordingSink::default();
        let mut processor = CommandProcessor::new(sink.clone());

        for text in ["Start", "pause", "", "start\n", "STOP"] {
            assert!(!processor.process(text).is_known());
        }
        assert!(sink.actions().is_empty());
    }

    #[test]
    fn test_boxed_sink() {
        let mut processor: CommandProcessor<Box<dyn CommandSink>> =
            CommandProcessor::new(Box::new(LogCommandSink));
        assert_eq!(processor.process("start"), Command::Start);
    }
}
