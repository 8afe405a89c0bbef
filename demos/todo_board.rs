//! Demonstration of list, change-tracking and reorderable slices on one board

use indexmap::IndexMap;
use slicekit::{
    lens, ListChanges, ListSlice, ListState, MutableListSlice, OrderState, ReorderableListSlice,
    SliceResult, Store, StoreConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct TodoItem {
    title: String,
    completed: bool,
}

#[derive(Clone, Default)]
struct Board {
    todos: ListState<u32, TodoItem>,
    changes: ListChanges<u32>,
    order: OrderState<u32>,
}

fn todo(title: &str) -> TodoItem {
    TodoItem {
        title: title.to_string(),
        completed: false,
    }
}

/// Prebuilt board as it would arrive from the server.
fn seeded_board() -> Board {
    let mut todos = IndexMap::new();
    todos.insert(1, todo("Learn Rust"));
    todos.insert(2, todo("Build slice catalog"));
    todos.insert(3, todo("Write documentation"));

    Board {
        todos: ListState::new(Some(todos)),
        order: OrderState::new(Some(vec![1, 2, 3])),
        ..Board::default()
    }
}

fn render(board: &Board) {
    let Some(todos) = board.todos.data.as_ref() else {
        println!("   (no todos loaded)");
        return;
    };
    for id in board.order.order.iter() {
        match todos.get(id) {
            Some(item) => {
                let status = if item.completed { "✓" } else { " " };
                println!("   [{}] #{} {}", status, id, item.title);
            }
            None => println!("   [?] #{} (not loaded)", id),
        }
    }
    println!(
        "   pending: added {:?}, deleted {:?}",
        board.changes.added, board.changes.deleted
    );
}

fn main() -> SliceResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Slice Example: Todo Board ===\n");

    let store = Store::with_config(seeded_board(), StoreConfig::named("todo-board"));
    let list = ListSlice::attach(&store, lens!(Board, todos))?;
    let todos = MutableListSlice::attach(&list, lens!(Board, changes))?;
    let order = ReorderableListSlice::attach(&store, lens!(Board, order))?;

    println!("1. Setting up subscriber on the order only");
    let _order_watch = store.subscribe_to(
        |board: &Board| board.order.order.clone(),
        |next, prev| println!("   [Order] {:?} -> {:?}", prev, next),
    );

    println!("\n2. Initial board:");
    store.read(render);

    println!("\n3. Adding a todo");
    todos.add(4, todo("Ship demo"));
    order.set_order(vec![1, 2, 3, 4]);
    store.read(render);

    println!("\n4. Completing the first todo");
    if let Some(first) = todos.get(&1) {
        todos.add(
            1,
            TodoItem {
                completed: true,
                ..(*first).clone()
            },
        );
    }
    store.read(render);

    println!("\n5. Moving the new todo to the top, then down one");
    order.move_to_top(&4);
    order.move_down(&4);
    store.read(render);

    println!("\n6. Removing a todo");
    todos.remove(&2);
    store.read(render);

    println!("\n7. Out-of-range and unknown moves are ignored");
    order.move_to(&3, 99);
    order.move_up(&42);
    store.read(render);

    println!("\n8. Changes synced, clearing tracking");
    todos.clear_changes();
    store.read(render);

    println!("\n✓ Example complete!");
    Ok(())
}
