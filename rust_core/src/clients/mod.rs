pub mod profile;
pub mod server_query;

// Re-export commonly used types
pub use profile::{
    default_discord_avatar, discord_avatar_url, steam_profile_url, CachedProfileResolver,
    ProfileResolver, SteamProfileClient,
};
pub use server_query::{A2sProbe, ServerStatusProbe};
