#[cfg(feature = "tracing")]
macro_rules! btrace {
    ($($tt:tt)*) => {
        tracing::trace!(target: "bookflow", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! btrace {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! bdebug {
    ($($tt:tt)*) => {
        tracing::debug!(target: "bookflow", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! bdebug {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! bwarn {
    ($($tt:tt)*) => {
        tracing::warn!(target: "bookflow", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! bwarn {
    ($($tt:tt)*) => {};
}
