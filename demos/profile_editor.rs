//! Demonstration of refreshable and mutable data slices for an edit form

use slicekit::{
    lens, DataState, MutableDataSlice, RefreshableDataSlice, RefreshableState, SliceResult, Store,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq)]
struct Profile {
    name: String,
    email: String,
}

#[derive(Clone, Debug, PartialEq)]
struct Preferences {
    theme: String,
    step: i32,
}

#[derive(Clone, Default)]
struct EditorState {
    profile: RefreshableState<Profile>,
    preferences: DataState<Preferences>,
}

fn main() -> SliceResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Slice Example: Profile Editor ===\n");

    let store = Store::new(EditorState::default());
    let profile = RefreshableDataSlice::attach(&store, lens!(EditorState, profile))?;
    let preferences = MutableDataSlice::attach(&store, lens!(EditorState, preferences))?;

    let _sub = store.subscribe(|state| {
        let name = state
            .profile
            .data
            .as_ref()
            .map_or("<none>", |p| p.name.as_str());
        println!("   [State] profile: {}", name);
    });

    println!("1. Editing preferences before they are loaded (ignored)");
    let applied = preferences.update_data(|p| p.step += 1);
    println!("   applied: {}", applied);

    println!("\n2. Loading data from the server");
    profile.refresh(Some(Profile {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }));
    preferences.set_data(Some(Preferences {
        theme: "light".to_string(),
        step: 1,
    }));
    println!("   pending changes: {}", profile.has_pending_changes());

    println!("\n3. Editing the form locally");
    profile.update_data(|p| p.name = "Ada Lovelace".to_string());
    preferences.update_data(|p| p.theme = "dark".to_string());
    println!("   pending changes: {}", profile.has_pending_changes());

    println!("\n4. Discarding the edit");
    profile.reset();
    println!("   pending changes: {}", profile.has_pending_changes());

    println!("\n5. Server sends a newer copy");
    profile.refresh(Some(Profile {
        name: "Ada L.".to_string(),
        email: "ada@example.com".to_string(),
    }));
    if let (Some(data), Some(fresh)) = (profile.data(), profile.fresh_data()) {
        println!("   data == fresh: {}", data == fresh);
    }
    println!("   preferences: {:?}", preferences.data());

    println!("\n✓ Example complete!");
    Ok(())
}
