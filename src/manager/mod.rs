pub mod task_list;
pub mod task_queue;
pub mod task_tree;
