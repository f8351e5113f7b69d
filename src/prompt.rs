const FLYBY_PROMPT: &str = "\
Shoot a smooth drone fly-by movie starring this tree. The drone should capture a full 360 degree view of the tree \
(The first frame should be the uploaded image facing the front of the tree. Then circle the drone around to show a \
frame facing the back of the tree. Keep circling in the same direction to face the front again for the final frame).\n\
Make the drone fly-by as fast as needed to finish the full 360 degree circle, and make the drone fly parallel to the \
ground (no vertical camera movement). Make sure every angle of the tree is captured (infer any details needed about \
surroundings). Make sure the entire tree and movie is reanimated ";

pub const DEFAULT_MODIFIER: &str = "with boosted, saturated, vibrant color grading.";

pub const STYLES: &[&str] = &[
    "like a high-contrast dramatic shadowy noir film",
    "like a Wizard-Oz vibrant Technicolor stage play",
    "like a film-grainy sepia-color old western film",
    "like a glitchy-VHS chromatic-abr vaporwave film",
    "like a neon-lit rainy city techy cyberpunk film",
    "like a telephoto-lens hi-bokeh NatGeo IMAX film",
    "like a hand-drawn cel-shade Studio Ghibli anime",
    "like a plastic-feel stop-motion claymation film",
    "like a gothic victorian puppety Tim Burton film",
    "like a gold-lit childish whimsical fantasy film",
    "like a swirling Van Gogh starry nights painting",
    "like a surrealist melting Salvador Dali painting",
];

/// Camera placements; `None` keeps the default color-grading modifier.
pub const ANGLES: &[Option<&str>] = &[
    None,
    Some("with the camera lying as low as possible from the POV of an ant on the ground looking up to the tree"),
    Some("with the camera raised high from the POV of a bird circling the tree canopy looking down at the tree"),
    Some("with the camera circling as far away from the tree as possible, giving a wide angle shot of the tree"),
    Some("with the camera flying into/close to the tree as possible, giving a close-up of the trunk and canopy"),
];

pub fn build_prompt(modifier: Option<&str>) -> String {
    let mut prompt = String::from(FLYBY_PROMPT);
    prompt.push_str(modifier.unwrap_or(DEFAULT_MODIFIER));
    prompt
}
