use crate::traits::message::ChannelMessage;

/// Derived state maintained from one channel of the shared connection
///
/// A feed never owns a socket. The feed runner subscribes its channel on the
/// shared client and calls [`apply`](ChannelFeed::apply) for every inbound
/// message, in arrival order, on a dedicated thread.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct TickCounter {
///     ticks: usize,
/// }
///
/// impl ChannelFeed for TickCounter {
///     fn channel(&self) -> &'static str {
///         "ticks"
///     }
///
///     fn apply(&mut self, message: &ChannelMessage) {
///         if message.is("tick") {
///             self.ticks += 1;
///         }
///     }
/// }
/// ```
pub trait ChannelFeed: Send + Sync + 'static {
    /// Channel name used in `subscribe` / `unsubscribe` control messages
    fn channel(&self) -> &'static str;

    /// Fold one inbound message into the feed state
    ///
    /// Messages of kinds the feed does not know must be ignored.
    fn apply(&mut self, message: &ChannelMessage);

    /// Called when the shared connection opens (`true`) or closes (`false`)
    fn on_connection_change(&mut self, _connected: bool) {}
}
