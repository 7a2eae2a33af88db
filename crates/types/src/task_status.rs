/// Status of an asynchronous resource mirrored into the UI-facing state.
///
/// Matched exhaustively by consumers; `Reloading` keeps the previous data
/// visible while a refresh is in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus<T, E = String> {
    Pending,
    Loading,
    Reloading(T),
    Successful(T),
    Failed(E),
}

impl<T, E> Default for TaskStatus<T, E> {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl<T, E> TaskStatus<T, E> {
    pub fn data(&self) -> Option<&T> {
        match self {
            TaskStatus::Reloading(data) | TaskStatus::Successful(data) => Some(data),
            TaskStatus::Pending | TaskStatus::Loading | TaskStatus::Failed(_) => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Loading | TaskStatus::Reloading(_))
    }

    /// Transition into a refresh: keeps data if we already have some.
    pub fn into_reloading(self) -> Self {
        match self {
            TaskStatus::Successful(data) | TaskStatus::Reloading(data) => {
                TaskStatus::Reloading(data)
            }
            TaskStatus::Pending | TaskStatus::Loading | TaskStatus::Failed(_) => {
                TaskStatus::Loading
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reloading_keeps_data() {
        let status: TaskStatus<u32> = TaskStatus::Successful(7);
        let status = status.into_reloading();
        assert_eq!(status, TaskStatus::Reloading(7));
        assert_eq!(status.data(), Some(&7));
    }

    #[test]
    fn failed_restarts_as_loading() {
        let status: TaskStatus<u32> = TaskStatus::Failed("boom".into());
        assert_eq!(status.into_reloading(), TaskStatus::Loading);
    }
}
