//! The exported image gallery: a radio-button carousel driven purely by
//! CSS, so the listing needs no script to page through images.

use askama::Template;

use super::data::Image;
use super::error::ListingError;

/// Thumbnails shown per row of the carousel.
pub const SET_SIZE: usize = 5;

pub struct Slide {
    pub n: usize,
    pub url: String,
}

pub struct ThumbSet {
    pub n: usize,
    pub thumbs: Vec<Slide>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

#[derive(Template)]
#[template(path = "listing/gallery.html")]
pub struct GalleryTemplate {
    pub slides: Vec<Slide>,
    pub sets: Vec<ThumbSet>,
}

impl GalleryTemplate {
    pub fn new(images: &[Image]) -> Self {
        let slides: Vec<Slide> = images
            .iter()
            .enumerate()
            .map(|(i, img)| Slide { n: i + 1, url: img.url.clone() })
            .collect();
        let set_count = slides.len().div_ceil(SET_SIZE);
        let sets = (0..set_count)
            .map(|s| ThumbSet {
                n: s + 1,
                thumbs: slides[s * SET_SIZE..((s + 1) * SET_SIZE).min(slides.len())]
                    .iter()
                    .map(|slide| Slide { n: slide.n, url: slide.url.clone() })
                    .collect(),
                prev: (s > 0).then_some(s),
                next: (s + 1 < set_count).then_some(s + 2),
            })
            .collect();
        GalleryTemplate { slides, sets }
    }
}

pub fn render_gallery(images: &[Image]) -> Result<String, ListingError> {
    Ok(GalleryTemplate::new(images).render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::dom;

    fn images(n: usize) -> Vec<Image> {
        (1..=n)
            .map(|i| Image { id: format!("image-{i}"), url: format!("https://img.example/{i}.jpg") })
            .collect()
    }

    fn count(html: &str, selector: &str) -> usize {
        let doc = dom::parse_document(html);
        dom::select_all(&doc, selector).unwrap().len()
    }

    #[test]
    fn radios_and_sets_follow_image_count() {
        for n in [1, 4, 5, 6, 11, 15] {
            let html = render_gallery(&images(n)).unwrap();
            assert_eq!(count(&html, "input.gallery-radio[name=gallery]"), n, "radios for {n}");
            assert_eq!(count(&html, ".gallery-thumb-set"), n.div_ceil(SET_SIZE), "sets for {n}");
            assert_eq!(count(&html, ".gallery-main img"), n);
            let doc = dom::parse_document(&html);
            for set in dom::select_all(&doc, ".gallery-thumb-set").unwrap() {
                assert!(dom::select_all(&set, ".gallery-thumb").unwrap().len() <= SET_SIZE);
            }
        }
    }

    #[test]
    fn only_first_radio_is_checked() {
        let html = render_gallery(&images(7)).unwrap();
        assert_eq!(count(&html, "input.gallery-radio[checked]"), 1);
        assert_eq!(count(&html, "#gallery-img-1[checked]"), 1);
        assert_eq!(count(&html, "input.gallery-set-radio[checked]"), 1);
    }

    #[test]
    fn set_navigation_links_neighbours() {
        let html = render_gallery(&images(11)).unwrap();
        let doc = dom::parse_document(&html);
        let middle = dom::select_first(&doc, ".set-2").unwrap();
        let navs: Vec<String> = dom::select_all(&middle, ".gallery-set-nav")
            .unwrap()
            .iter()
            .filter_map(|n| dom::attr(n, "for"))
            .collect();
        assert_eq!(navs, vec!["gallery-set-1", "gallery-set-3"]);
        assert!(dom::select_first(&doc, ".set-1 .prev").is_none());
        assert!(dom::select_first(&doc, ".set-3 .next").is_none());
    }

    #[test]
    fn urls_are_escaped_in_attributes() {
        let imgs = vec![Image { id: "image-1".into(), url: "a.jpg?x=1&y=\"2\"".into() }];
        let html = render_gallery(&imgs).unwrap();
        let doc = dom::parse_document(&html);
        let img = dom::select_first(&doc, ".gallery-main img").unwrap();
        assert_eq!(dom::attr(&img, "src").as_deref(), Some("a.jpg?x=1&y=\"2\""));
    }

    #[test]
    fn no_script_in_output() {
        let html = render_gallery(&images(3)).unwrap();
        assert!(!html.contains("<script"));
    }
}
